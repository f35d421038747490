//! Proof-of-work: the difficulty predicate and the knobs that bound a search.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use crate::{constants::HASH_HEX_SIZE, Block, PowError};

/// Number of leading `'0'` characters in a hex digest.
pub fn leading_zero_hex_digits(hash: &str) -> usize {
    hash.bytes().take_while(|b| *b == b'0').count()
}

/// True when the first `difficulty` hex digits of `hash` are all `'0'`.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    difficulty <= HASH_HEX_SIZE && leading_zero_hex_digits(hash) >= difficulty
}

/// Clonable flag that stops an in-flight search at its next iteration.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Bounds for a nonce search. The default is unbounded and never cancelled.
#[derive(Clone, Debug, Default)]
pub struct MiningControl {
    pub max_attempts: Option<u64>,
    pub cancel: CancelToken,
}

impl MiningControl {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(max_attempts: u64) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Checked before every hash attempt; `attempts` is the count made so far.
    pub(crate) fn check(&self, attempts: u64) -> Result<(), PowError> {
        if self.cancel.is_cancelled() {
            return Err(PowError::Cancelled { attempts });
        }
        match self.max_attempts {
            Some(max) if attempts >= max => Err(PowError::AttemptLimitReached { attempts }),
            _ => Ok(()),
        }
    }
}

/// Outcome of a successful search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiningReport {
    pub nonce: u64,
    pub hash: String,
    /// Hashes computed, including the initial one.
    pub attempts: u64,
    pub elapsed: Duration,
}

/// Seal `block` and hand it back, the by-value form of [`Block::mine`].
pub fn mine_block(mut block: Block, difficulty: u32) -> Result<Block, PowError> {
    block.mine(difficulty, &MiningControl::unbounded())?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_zero_hex_digits_examples() {
        assert_eq!(leading_zero_hex_digits("abc"), 0);
        assert_eq!(leading_zero_hex_digits("0abc"), 1);
        assert_eq!(leading_zero_hex_digits("000f"), 3);
        assert_eq!(leading_zero_hex_digits("0000"), 4);
        assert_eq!(leading_zero_hex_digits(""), 0);
    }

    #[test]
    fn meets_difficulty_examples() {
        assert!(meets_difficulty("f00", 0));
        assert!(meets_difficulty("00f", 2));
        assert!(!meets_difficulty("00f", 3));
        let all_zero = "0".repeat(HASH_HEX_SIZE);
        assert!(meets_difficulty(&all_zero, HASH_HEX_SIZE as u32));
        assert!(!meets_difficulty(&all_zero, HASH_HEX_SIZE as u32 + 1));
    }

    #[test]
    fn control_reports_cancellation_before_cap() {
        let cancel = CancelToken::new();
        let control = MiningControl::with_max_attempts(10).with_cancel(cancel.clone());
        assert_eq!(control.check(3), Ok(()));
        cancel.cancel();
        assert_eq!(control.check(3), Err(PowError::Cancelled { attempts: 3 }));
    }

    #[test]
    fn control_enforces_attempt_cap() {
        let control = MiningControl::with_max_attempts(5);
        assert_eq!(control.check(4), Ok(()));
        assert_eq!(
            control.check(5),
            Err(PowError::AttemptLimitReached { attempts: 5 })
        );
        assert_eq!(MiningControl::unbounded().check(u64::MAX), Ok(()));
    }
}
