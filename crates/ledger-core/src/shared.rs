//! Thread-safe handle around a [`Ledger`].
//!
//! Admission, both validity passes of a mining round and the append all run
//! under one lock, so every operation sees an unsplit view of chain and queue.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    pow::MiningControl, AdmissionError, Ledger, MineError, MineOutcome, Transaction,
};

#[derive(Clone, Debug, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    // Every ledger method leaves chain and queue consistent even if a caller
    // panicked mid-call, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_transaction(&self, tx: Transaction) -> Result<(), AdmissionError> {
        self.lock().create_transaction(tx)
    }

    pub fn airdrop_to_addresses<I, A>(
        &self,
        addresses: I,
        amount: u64,
    ) -> Vec<Result<(), AdmissionError>>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.lock().airdrop_to_addresses(addresses, amount)
    }

    pub fn mine_pending_transactions(&self, miner: &str) -> Result<MineOutcome, MineError> {
        self.lock().mine_pending_transactions(miner)
    }

    pub fn mine_pending_transactions_with(
        &self,
        miner: &str,
        control: &MiningControl,
    ) -> Result<MineOutcome, MineError> {
        self.lock().mine_pending_transactions_with(miner, control)
    }

    pub fn balance_of(&self, address: &str) -> i128 {
        self.lock().balance_of(address)
    }

    pub fn is_chain_valid(&self) -> bool {
        self.lock().is_chain_valid()
    }

    pub fn block_count(&self) -> usize {
        self.lock().block_count()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending_transactions().len()
    }

    /// Run `f` with exclusive access to the ledger.
    pub fn with<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        f(&mut self.lock())
    }
}
