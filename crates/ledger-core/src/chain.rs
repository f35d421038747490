//! The ledger: an append-only chain of mined blocks plus the queue of
//! transactions waiting for the next one.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    constants::GENESIS_PREVIOUS_HASH, now_millis, pow::MiningControl, AdmissionError, Block,
    ChainError, ConfigError, LedgerConfig, MineError, Transaction,
};

/// Result of a mining round that did not fail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum MineOutcome {
    /// No pending transaction survived revalidation. Chain and queue are unchanged.
    NothingToMine { pending: usize },
    Mined(MinedBlock),
}

/// Summary of a block appended by [`Ledger::mine_pending_transactions`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MinedBlock {
    pub index: usize,
    pub hash: String,
    pub nonce: u64,
    pub attempts: u64,
    pub included: Vec<Transaction>,
    /// Pending transactions that failed revalidation. They are discarded,
    /// not requeued.
    pub dropped: Vec<Transaction>,
}

/// Single-writer ledger. Owns its chain and pending queue exclusively; wrap it
/// in [`crate::SharedLedger`] to accept submissions from several threads.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    config: LedgerConfig,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::with_valid_config(LedgerConfig::default())
    }
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: LedgerConfig) -> Self {
        Self {
            chain: vec![Self::create_genesis_block()],
            pending: Vec::new(),
            config,
        }
    }

    /// The unmined root block: one zero-amount record with no parties.
    pub fn create_genesis_block() -> Block {
        genesis_block(now_millis())
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn latest_block(&self) -> &Block {
        // The chain always holds at least the genesis block.
        &self.chain[self.chain.len() - 1]
    }

    /// Number of blocks, genesis included. Never zero.
    pub fn block_count(&self) -> usize {
        self.chain.len()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn mining_reward(&self) -> u64 {
        self.config.mining_reward
    }

    /// Queue `tx` for the next block. Transfers must be covered by the payer's
    /// confirmed balance; minted transactions are always admitted.
    pub fn create_transaction(&mut self, tx: Transaction) -> Result<(), AdmissionError> {
        if let Err(err) = self.check_funds(&tx) {
            warn!(%err, "transaction rejected");
            return Err(err);
        }
        debug!(
            payer = tx.payer.as_deref().unwrap_or("<minted>"),
            payee = tx.payee.as_deref().unwrap_or("<none>"),
            amount = tx.amount,
            "transaction admitted"
        );
        self.pending.push(tx);
        Ok(())
    }

    pub fn is_transaction_valid(&self, tx: &Transaction) -> bool {
        self.check_funds(tx).is_ok()
    }

    // Shared by admission and mining-time revalidation. Only mined blocks
    // count; other pending transactions are not netted in.
    fn check_funds(&self, tx: &Transaction) -> Result<(), AdmissionError> {
        let Some(payer) = &tx.payer else {
            return Ok(());
        };
        let balance = self.balance_of(payer);
        if balance < i128::from(tx.amount) {
            return Err(AdmissionError::InsufficientBalance {
                payer: payer.clone(),
                balance,
                amount: tx.amount,
            });
        }
        Ok(())
    }

    /// Replays every transaction on the chain.
    pub fn balance_of(&self, address: &str) -> i128 {
        let mut balance = 0i128;
        for tx in self.chain.iter().flat_map(|b| b.transactions()) {
            if tx.payer.as_deref() == Some(address) {
                balance -= i128::from(tx.amount);
            }
            if tx.payee.as_deref() == Some(address) {
                balance += i128::from(tx.amount);
            }
        }
        balance
    }

    /// Every address that appears as payer or payee on the chain.
    pub fn addresses(&self) -> BTreeSet<&str> {
        self.chain
            .iter()
            .flat_map(|b| b.transactions())
            .flat_map(|tx| [tx.payer.as_deref(), tx.payee.as_deref()])
            .flatten()
            .collect()
    }

    /// Sum of all minted amounts on the chain.
    pub fn total_minted(&self) -> i128 {
        self.chain
            .iter()
            .flat_map(|b| b.transactions())
            .filter(|tx| tx.is_minted())
            .map(|tx| i128::from(tx.amount))
            .sum()
    }

    /// Mine using the search bounds from the ledger's configuration.
    pub fn mine_pending_transactions(&mut self, miner: &str) -> Result<MineOutcome, MineError> {
        let control = self.config.mining_control();
        self.mine_pending_transactions_with(miner, &control)
    }

    /// Revalidate the queue, seal the survivors into a block on top of the
    /// current tip and reseed the queue with the miner's reward.
    ///
    /// If the search fails, chain and queue are left exactly as they were.
    pub fn mine_pending_transactions_with(
        &mut self,
        miner: &str,
        control: &MiningControl,
    ) -> Result<MineOutcome, MineError> {
        let (included, dropped): (Vec<Transaction>, Vec<Transaction>) = self
            .pending
            .iter()
            .cloned()
            .partition(|tx| self.is_transaction_valid(tx));

        if included.is_empty() {
            debug!(pending = self.pending.len(), "no transactions to mine");
            return Ok(MineOutcome::NothingToMine {
                pending: self.pending.len(),
            });
        }

        let mut block = Block::new(now_millis(), included.clone(), self.latest_block().hash());
        let report = block.mine(self.config.difficulty, control)?;

        self.chain.push(block);
        let index = self.chain.len() - 1;
        for tx in &dropped {
            warn!(
                payer = tx.payer.as_deref().unwrap_or("<minted>"),
                amount = tx.amount,
                "pending transaction dropped at mining time"
            );
        }
        self.pending = vec![Transaction::minted(miner, self.config.mining_reward)];
        info!(index, hash = %report.hash, included = included.len(), "block appended");

        Ok(MineOutcome::Mined(MinedBlock {
            index,
            hash: report.hash,
            nonce: report.nonce,
            attempts: report.attempts,
            included,
            dropped,
        }))
    }

    pub fn is_chain_valid(&self) -> bool {
        self.verify_chain().is_ok()
    }

    /// Checks every non-genesis block's stored hash and its link to the
    /// predecessor, stopping at the first violation.
    pub fn verify_chain(&self) -> Result<(), ChainError> {
        for (offset, pair) in self.chain.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let index = offset + 1;
            let computed = current.calculate_hash();
            if current.hash() != computed {
                return Err(ChainError::HashMismatch {
                    index,
                    stored: current.hash().to_string(),
                    computed,
                });
            }
            if current.previous_hash() != previous.hash() {
                return Err(ChainError::BrokenLink {
                    index,
                    expected: previous.hash().to_string(),
                    found: current.previous_hash().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Admit one minted transaction per address, each independently.
    pub fn airdrop_to_addresses<I, A>(
        &mut self,
        addresses: I,
        amount: u64,
    ) -> Vec<Result<(), AdmissionError>>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        addresses
            .into_iter()
            .map(|address| self.create_transaction(Transaction::minted(address, amount)))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn chain_mut(&mut self) -> &mut Vec<Block> {
        &mut self.chain
    }
}

/// Genesis block stamped at `timestamp`. It is never mined.
pub fn genesis_block(timestamp: u64) -> Block {
    let record = Transaction::new(timestamp, None, None, 0);
    Block::new(timestamp, vec![record], GENESIS_PREVIOUS_HASH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(difficulty: u32) -> Ledger {
        Ledger::new(LedgerConfig::new(difficulty, 50)).unwrap()
    }

    fn funded(difficulty: u32) -> Ledger {
        let mut ledger = ledger(difficulty);
        ledger.airdrop_to_addresses(["alice", "bob"], 100);
        ledger.mine_pending_transactions("miner").unwrap();
        ledger
    }

    #[test]
    fn genesis_block_example() {
        let genesis = genesis_block(1_600_000_000_000);
        assert_eq!(genesis.previous_hash(), "0");
        assert_eq!(genesis.nonce(), 0);
        assert_eq!(genesis.transactions().len(), 1);
        let record = &genesis.transactions()[0];
        assert_eq!(record.payer, None);
        assert_eq!(record.payee, None);
        assert_eq!(record.amount, 0);
        assert_eq!(
            genesis.hash(),
            "e4f3d3e5f5b5497c2bdbfef3463e16c7d8165bc39d70d4080dcfd4da072ca335"
        );
    }

    #[test]
    fn new_ledger_holds_only_genesis() {
        let ledger = Ledger::default();
        assert_eq!(ledger.block_count(), 1);
        assert_eq!(ledger.latest_block().previous_hash(), "0");
        assert!(ledger.pending_transactions().is_empty());
        assert_eq!(ledger.difficulty(), 3);
        assert_eq!(ledger.mining_reward(), 50);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn invalid_config_is_refused() {
        assert!(Ledger::new(LedgerConfig::new(100, 50)).is_err());
    }

    #[test]
    fn minted_transactions_skip_balance_check() {
        let mut ledger = ledger(1);
        assert!(ledger.create_transaction(Transaction::minted("alice", 1_000)).is_ok());
        assert_eq!(ledger.pending_transactions().len(), 1);
    }

    #[test]
    fn rejection_leaves_queue_untouched() {
        let mut ledger = ledger(1);
        ledger.create_transaction(Transaction::minted("alice", 10)).unwrap();
        let before = ledger.pending_transactions().to_vec();

        let err = ledger
            .create_transaction(Transaction::transfer("bob", "alice", 5))
            .unwrap_err();
        assert_eq!(
            err,
            AdmissionError::InsufficientBalance {
                payer: "bob".to_string(),
                balance: 0,
                amount: 5
            }
        );
        assert_eq!(ledger.pending_transactions(), before.as_slice());
    }

    #[test]
    fn pending_credit_does_not_fund_a_transfer() {
        let mut ledger = ledger(1);
        ledger.create_transaction(Transaction::minted("alice", 100)).unwrap();
        assert!(ledger
            .create_transaction(Transaction::transfer("alice", "bob", 10))
            .is_err());
    }

    #[test]
    fn exact_balance_is_enough() {
        let mut ledger = funded(1);
        assert!(ledger
            .create_transaction(Transaction::transfer("alice", "bob", 100))
            .is_ok());
        assert!(ledger
            .create_transaction(Transaction::transfer("alice", "bob", 101))
            .is_err());
    }

    #[test]
    fn empty_queue_mines_nothing() {
        let mut ledger = ledger(1);
        let outcome = ledger.mine_pending_transactions("miner").unwrap();
        assert_eq!(outcome, MineOutcome::NothingToMine { pending: 0 });
        assert_eq!(ledger.block_count(), 1);
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn mining_links_block_to_tip_and_pays_reward() {
        let mut ledger = ledger(2);
        let tip = ledger.latest_block().hash().to_string();
        ledger.airdrop_to_addresses(["alice"], 10);

        let outcome = ledger.mine_pending_transactions("miner").unwrap();
        let MineOutcome::Mined(mined) = outcome else {
            panic!("expected a mined block");
        };
        assert_eq!(mined.index, 1);
        assert!(mined.dropped.is_empty());
        assert_eq!(mined.included.len(), 1);

        let block = ledger.latest_block();
        assert_eq!(block.previous_hash(), tip);
        assert_eq!(block.hash(), mined.hash);
        assert!(block.hash().starts_with("00"));

        let pending = ledger.pending_transactions();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].is_minted());
        assert_eq!(pending[0].payee.as_deref(), Some("miner"));
        assert_eq!(pending[0].amount, 50);
        // The reward is queued, not yet on chain.
        assert_eq!(ledger.balance_of("miner"), 0);
    }

    #[test]
    fn revalidation_drops_overdrawn_transfers() {
        let mut ledger = funded(1);
        // Each transfer is covered on its own against the confirmed balance.
        ledger.create_transaction(Transaction::transfer("alice", "bob", 60)).unwrap();
        ledger.create_transaction(Transaction::transfer("alice", "bob", 60)).unwrap();
        // Seal a block that spends alice's funds before the queue is mined.
        let tip = ledger.latest_block().hash().to_string();
        let mut spend = Block::new(
            now_millis(),
            vec![Transaction::transfer("alice", "carol", 100)],
            tip,
        );
        spend.mine(1, &MiningControl::unbounded()).unwrap();
        ledger.chain_mut().push(spend);

        let MineOutcome::Mined(mined) = ledger.mine_pending_transactions("miner").unwrap() else {
            panic!("reward transaction should still be minable");
        };
        assert_eq!(mined.included.len(), 1);
        assert!(mined.included[0].is_minted());
        assert_eq!(mined.dropped.len(), 2);
        assert_eq!(ledger.balance_of("alice"), 0);
        assert_eq!(ledger.pending_transactions().len(), 1);
    }

    #[test]
    fn all_invalid_queue_is_kept() {
        let mut ledger = funded(1);
        // Replace the queued reward with a transfer that will be overdrawn.
        ledger.pending.clear();
        ledger.create_transaction(Transaction::transfer("alice", "bob", 100)).unwrap();
        let tip = ledger.latest_block().hash().to_string();
        let mut spend = Block::new(
            now_millis(),
            vec![Transaction::transfer("alice", "bob", 100)],
            tip,
        );
        spend.mine(1, &MiningControl::unbounded()).unwrap();
        ledger.chain_mut().push(spend);
        let length = ledger.block_count();

        let outcome = ledger.mine_pending_transactions("miner").unwrap();
        assert_eq!(outcome, MineOutcome::NothingToMine { pending: 1 });
        assert_eq!(ledger.block_count(), length);
        assert_eq!(ledger.pending_transactions().len(), 1);
    }

    #[test]
    fn failed_search_leaves_state_untouched() {
        let mut ledger = ledger(6);
        ledger.airdrop_to_addresses(["alice"], 10);
        let err = ledger
            .mine_pending_transactions_with("miner", &MiningControl::with_max_attempts(3))
            .unwrap_err();
        assert!(matches!(err, MineError::Pow(_)));
        assert_eq!(ledger.block_count(), 1);
        assert_eq!(ledger.pending_transactions().len(), 1);
        assert_eq!(ledger.pending_transactions()[0].payee.as_deref(), Some("alice"));
    }

    #[test]
    fn tampered_amount_breaks_validity() {
        let mut ledger = funded(1);
        assert!(ledger.is_chain_valid());
        ledger.chain_mut()[1].tamper().1[0].amount = 1_000;
        assert!(!ledger.is_chain_valid());
        assert!(matches!(
            ledger.verify_chain(),
            Err(ChainError::HashMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn tampered_timestamp_breaks_validity() {
        let mut ledger = funded(1);
        *ledger.chain_mut()[1].tamper().0 += 1;
        assert!(!ledger.is_chain_valid());
    }

    #[test]
    fn tampered_nonce_breaks_validity() {
        let mut ledger = funded(1);
        *ledger.chain_mut()[1].tamper().2 += 1;
        assert!(!ledger.is_chain_valid());
    }

    #[test]
    fn substituted_block_breaks_link() {
        let mut ledger = funded(1);
        ledger.mine_pending_transactions("miner").unwrap();
        // A self-consistent block that does not point at its predecessor.
        let mut forged =
            Block::new(now_millis(), vec![Transaction::minted("eve", 1)], "deadbeef");
        forged.mine(1, &MiningControl::unbounded()).unwrap();
        ledger.chain_mut()[2] = forged;
        assert!(matches!(
            ledger.verify_chain(),
            Err(ChainError::BrokenLink { index: 2, .. })
        ));
    }

    #[test]
    fn reordered_blocks_break_link() {
        let mut ledger = funded(1);
        ledger.mine_pending_transactions("miner").unwrap();
        ledger.chain_mut().swap(1, 2);
        assert!(!ledger.is_chain_valid());
    }

    #[test]
    fn genesis_is_not_revalidated() {
        let mut ledger = ledger(1);
        *ledger.chain_mut()[0].tamper().2 = 7;
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn addresses_and_total_minted() {
        let ledger = funded(1);
        let addresses: Vec<&str> = ledger.addresses().into_iter().collect();
        assert_eq!(addresses, vec!["alice", "bob"]);
        assert_eq!(ledger.total_minted(), 200);
    }
}
