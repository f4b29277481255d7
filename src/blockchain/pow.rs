use log::{debug, trace, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;

use super::block::UnsealedBlock;

/// Symbol a qualifying hash must start with.
pub const TARGET_SYMBOL: u8 = b'0';

/// Length of a hex SHA-256 digest; no hash can carry more leading zeros.
pub const MAX_DIFFICULTY: u32 = 64;

/// True when `hash` starts with at least `difficulty` target symbols.
/// Difficulty 0 accepts every hash.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let needed = difficulty as usize;
    hash.len() >= needed && hash.bytes().take(needed).all(|b| b == TARGET_SYMBOL)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("proof-of-work search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
    #[error("nonce space exhausted without a qualifying hash")]
    NonceSpaceExhausted,
}

/// Result of a successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub nonce: String,
    pub hash: String,
    pub attempts: u64,
}

/// Cooperative cancellation flag shared between a request and its search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns a guard that cancels this token when dropped, e.g. when the
    /// HTTP handler owning it is dropped because the client went away.
    pub fn drop_guard(&self) -> CancelGuard {
        CancelGuard(self.clone())
    }
}

#[derive(Debug)]
pub struct CancelGuard(CancelToken);

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Nonce search. Runs on the caller's thread and never touches the ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct Miner {
    attempt_delay: Duration,
}

impl Miner {
    /// `attempt_delay` throttles failed attempts; zero disables throttling.
    pub fn new(attempt_delay: Duration) -> Self {
        Self { attempt_delay }
    }

    /// Tries nonces `0, 1, 2, ...` (lowercase hex) until the block hash has
    /// `difficulty` leading zeros. Unbounded unless `cancel` fires.
    pub fn find_nonce(
        &self,
        block: &UnsealedBlock,
        difficulty: u32,
        cancel: &CancelToken,
    ) -> Result<Solution, MiningError> {
        let mut counter: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                warn!(
                    "MINER - search for block #{} cancelled after {} attempts",
                    block.index, counter
                );
                return Err(MiningError::Cancelled { attempts: counter });
            }

            let nonce = format!("{counter:x}");
            let hash = block.hash_with_nonce(&nonce);
            if meets_difficulty(&hash, difficulty) {
                let attempts = counter.saturating_add(1);
                debug!(
                    "MINER - block #{} work done: {} (nonce={}, attempts={})",
                    block.index, hash, nonce, attempts
                );
                return Ok(Solution {
                    nonce,
                    hash,
                    attempts,
                });
            }

            trace!("MINER - {} do more work!", hash);
            counter = counter
                .checked_add(1)
                .ok_or(MiningError::NonceSpaceExhausted)?;
            if !self.attempt_delay.is_zero() {
                thread::sleep(self.attempt_delay);
            }
        }
    }
}
