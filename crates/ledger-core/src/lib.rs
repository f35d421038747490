//! Append-only proof-of-work ledger.
//!
//! Callers submit [`Transaction`]s to a [`Ledger`], which checks the payer's
//! confirmed balance and queues them. Mining seals the queued transactions into
//! a [`Block`] linked to the current tip and credits the miner on the next
//! round. Balances are derived by replaying the whole chain.
//!
//! ```
//! use ledger_core::{Ledger, LedgerConfig, Transaction};
//!
//! let mut ledger = Ledger::new(LedgerConfig::new(2, 50)).unwrap();
//! ledger.airdrop_to_addresses(["alice", "bob"], 100);
//! ledger.mine_pending_transactions("miner").unwrap();
//!
//! ledger.create_transaction(Transaction::transfer("alice", "bob", 40)).unwrap();
//! ledger.mine_pending_transactions("miner").unwrap();
//!
//! assert_eq!(ledger.balance_of("alice"), 60);
//! assert_eq!(ledger.balance_of("miner"), 50);
//! assert!(ledger.is_chain_valid());
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod pow;
pub mod shared;
pub mod transaction;

pub use block::Block;
pub use chain::{genesis_block, Ledger, MineOutcome, MinedBlock};
pub use config::LedgerConfig;
pub use error::{AdmissionError, ChainError, ConfigError, MineError, PowError};
pub use pow::{CancelToken, MiningControl, MiningReport};
pub use shared::SharedLedger;
pub use transaction::Transaction;

/// Opaque participant identifier. Nothing proves ownership of an address.
pub type Address = String;

/// Milliseconds since the UNIX epoch; 0 if the clock reads before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
