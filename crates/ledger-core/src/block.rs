use std::time::Instant;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{
    constants::HASH_HEX_SIZE,
    pow::{meets_difficulty, MiningControl, MiningReport},
    PowError, Transaction,
};

/// An ordered batch of transactions linked to its predecessor by hash.
///
/// `hash` always equals [`Block::calculate_hash`] for the current fields of a
/// freshly built or mined block; the two diverge only if a block is decoded
/// from tampered data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    timestamp: u64,
    transactions: Vec<Transaction>,
    previous_hash: String,
    nonce: u64,
    hash: String,
}

impl Block {
    pub fn new(
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
    ) -> Self {
        let mut block = Self {
            timestamp,
            transactions,
            previous_hash: previous_hash.into(),
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// SHA-256 over previous hash, timestamp, the JSON transaction batch and
    /// the nonce, concatenated in that order, as lowercase hex.
    pub fn calculate_hash(&self) -> String {
        compute_hash(&self.previous_hash, self.timestamp, &self.transactions, self.nonce)
    }

    /// Whether the stored hash still matches the block's contents.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Increment the nonce until the hash has `difficulty` leading zero hex
    /// digits. Nonce and hash are updated together on every step.
    pub fn mine(
        &mut self,
        difficulty: u32,
        control: &MiningControl,
    ) -> Result<MiningReport, PowError> {
        if difficulty as usize > HASH_HEX_SIZE {
            return Err(PowError::DifficultyOutOfRange {
                difficulty,
                max: HASH_HEX_SIZE,
            });
        }

        let start = Instant::now();
        let mut attempts = 1u64;
        while !meets_difficulty(&self.hash, difficulty) {
            control.check(attempts)?;
            self.set_nonce(self.nonce.wrapping_add(1));
            attempts += 1;
        }

        info!(hash = %self.hash, nonce = self.nonce, attempts, "block mined");
        Ok(MiningReport {
            nonce: self.nonce,
            hash: self.hash.clone(),
            attempts,
            elapsed: start.elapsed(),
        })
    }

    fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
        self.hash = self.calculate_hash();
    }

    /// Field access that bypasses hash maintenance, for integrity tests.
    #[cfg(test)]
    pub(crate) fn tamper(&mut self) -> (&mut u64, &mut Vec<Transaction>, &mut u64) {
        (&mut self.timestamp, &mut self.transactions, &mut self.nonce)
    }
}

fn compute_hash(
    previous_hash: &str,
    timestamp: u64,
    transactions: &[Transaction],
    nonce: u64,
) -> String {
    // Plain structs of strings and integers always serialize.
    let batch =
        serde_json::to_string(transactions).expect("transaction batch serializes to JSON");
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(batch.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
