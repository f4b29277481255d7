pub mod block;
pub mod hasher;
pub mod ledger;
pub mod pow;
pub mod validation;

pub use block::{Block, BlockFactory, UnsealedBlock};
pub use ledger::{ChainSnapshot, Ledger, LedgerConfig, LedgerError};
pub use pow::{CancelGuard, CancelToken, MAX_DIFFICULTY, Miner, MiningError};
pub use validation::{ChainAuditError, ValidationError};

/// Default Proof-of-Work difficulty (number of leading zeros).
pub const DEFAULT_DIFFICULTY: u32 = 1;

/// Default pause after a failed nonce, in milliseconds (no throttling).
pub const DEFAULT_MINING_DELAY_MS: u64 = 0;
