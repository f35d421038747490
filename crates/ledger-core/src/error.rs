use thiserror::Error;

use crate::Address;

/// Why a transaction was not admitted to the pending queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("insufficient balance: {payer} holds {balance}, needs {amount}")]
    InsufficientBalance {
        payer: Address,
        balance: i128,
        amount: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowError {
    #[error("difficulty {difficulty} exceeds the {max} hex digits of a hash")]
    DifficultyOutOfRange { difficulty: u32, max: usize },

    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("no valid nonce within {attempts} attempts")]
    AttemptLimitReached { attempts: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MineError {
    #[error("proof-of-work failed: {0}")]
    Pow(#[from] PowError),
}

/// First integrity violation found while walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("block {index}: stored hash {stored} does not match recomputed {computed}")]
    HashMismatch {
        index: usize,
        stored: String,
        computed: String,
    },

    #[error("block {index}: previous hash {found} does not link to {expected}")]
    BrokenLink {
        index: usize,
        expected: String,
        found: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("difficulty {difficulty} is above the maximum of {max}")]
    DifficultyTooHigh { difficulty: u32, max: usize },

    #[error("max_mining_attempts must be greater than zero")]
    ZeroAttemptCap,
}
