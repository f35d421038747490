use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, HASH_HEX_SIZE},
    pow::MiningControl,
    ConfigError,
};

/// Construction-time parameters of a [`crate::Ledger`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading zero hex digits a mined block hash must carry.
    pub difficulty: u32,
    /// Amount minted to the miner after every mined block.
    pub mining_reward: u64,
    /// Upper bound on nonce attempts per block. `None` searches until found.
    pub max_mining_attempts: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
            max_mining_attempts: None,
        }
    }
}

impl LedgerConfig {
    pub fn new(difficulty: u32, mining_reward: u64) -> Self {
        Self {
            difficulty,
            mining_reward,
            ..Self::default()
        }
    }

    pub fn with_max_mining_attempts(mut self, max: u64) -> Self {
        self.max_mining_attempts = Some(max);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty as usize > HASH_HEX_SIZE {
            return Err(ConfigError::DifficultyTooHigh {
                difficulty: self.difficulty,
                max: HASH_HEX_SIZE,
            });
        }
        if self.max_mining_attempts == Some(0) {
            return Err(ConfigError::ZeroAttemptCap);
        }
        Ok(())
    }

    /// Search bounds derived from this configuration.
    pub fn mining_control(&self) -> MiningControl {
        MiningControl {
            max_attempts: self.max_mining_attempts,
            ..MiningControl::default()
        }
    }
}
