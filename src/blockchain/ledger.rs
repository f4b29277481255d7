use log::{debug, error, info, warn};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;

use super::DEFAULT_DIFFICULTY;
use super::block::{Block, BlockFactory};
use super::pow::{CancelToken, MAX_DIFFICULTY, Miner, MiningError};
use super::validation::{self, ChainAuditError, ValidationError};

/// Immutable view of the chain at one instant.
pub type ChainSnapshot = Arc<Vec<Block>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Leading zeros every block hash must carry; 0 disables proof-of-work.
    pub difficulty: u32,
    /// Pause after each failed nonce.
    pub attempt_delay: Duration,
    /// How often an append is rebuilt when another writer moved the tail
    /// first. `None` retries until it commits.
    pub max_append_retries: Option<u32>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            attempt_delay: Duration::ZERO,
            max_append_retries: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("stale tail: block was built on {expected} but the tail is now {found}")]
    StaleTail { expected: String, found: String },
    #[error("block creation failed: {0}")]
    Mining(#[from] MiningError),
    #[error("difficulty {difficulty} is unreachable: a digest has at most {max} leading zeros")]
    DifficultyOutOfRange { difficulty: u32, max: u32 },
}

/// In-memory hash-linked ledger.
///
/// The lock guards only the chain reference. Mining runs on a private
/// candidate outside it; the write section re-checks the tail, validates and
/// pushes.
#[derive(Debug)]
pub struct Ledger {
    chain: RwLock<ChainSnapshot>,
    factory: BlockFactory,
    config: LedgerConfig,
}

impl Ledger {
    /// Initialize a new ledger with a (mined, if required) genesis block.
    ///
    /// Fails with [`LedgerError::DifficultyOutOfRange`] above
    /// [`MAX_DIFFICULTY`], where the genesis search could never finish.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        if config.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::DifficultyOutOfRange {
                difficulty: config.difficulty,
                max: MAX_DIFFICULTY,
            });
        }

        let factory = BlockFactory::new(config.difficulty, Miner::new(config.attempt_delay));
        let genesis = factory.genesis(&CancelToken::new())?;
        validation::validate_genesis(&genesis, config.difficulty)?;
        info!(
            "LEDGER - genesis {} (difficulty={}, nonce={:?})",
            genesis.hash, config.difficulty, genesis.nonce
        );

        Ok(Self::with_genesis(config, genesis))
    }

    fn with_genesis(config: LedgerConfig, genesis: Block) -> Self {
        Self {
            chain: RwLock::new(Arc::new(vec![genesis])),
            factory: BlockFactory::new(config.difficulty, Miner::new(config.attempt_delay)),
            config,
        }
    }

    // Writers only ever swap or push whole blocks, so a poisoned lock still
    // guards a consistent chain.
    fn read(&self) -> RwLockReadGuard<'_, ChainSnapshot> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChainSnapshot> {
        self.chain.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        Arc::clone(&*self.read())
    }

    /// Return the last block in the chain.
    pub fn tail(&self) -> Block {
        tail_of(&self.read()).clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Always false: the genesis block is never removed.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Build, validate and append a block carrying `payload`.
    pub fn append(&self, payload: impl Into<String>) -> Result<Block, LedgerError> {
        self.append_cancellable(payload, &CancelToken::new())
    }

    /// Like [`Ledger::append`], but the proof-of-work search stops when
    /// `cancel` fires. A cancelled append leaves the ledger unchanged.
    pub fn append_cancellable(
        &self,
        payload: impl Into<String>,
        cancel: &CancelToken,
    ) -> Result<Block, LedgerError> {
        self.append_with(payload.into(), |base, payload| {
            self.factory.create(base, payload, cancel)
        })
    }

    /// Optimistic append loop: `build` runs with no lock held, then
    /// [`Ledger::commit`] checks the tail it was given is still current.
    fn append_with<F>(&self, payload: String, mut build: F) -> Result<Block, LedgerError>
    where
        F: FnMut(&Block, String) -> Result<Block, MiningError>,
    {
        let mut retries = 0u32;
        loop {
            let base = self.tail();
            let candidate = build(&base, payload.clone())?;
            match self.commit(&base, candidate) {
                Err(LedgerError::StaleTail { expected, found }) if self.may_retry(retries) => {
                    retries += 1;
                    warn!(
                        "LEDGER - tail moved {} -> {} during mining; rebuilding (retry {})",
                        expected, found, retries
                    );
                }
                other => return other,
            }
        }
    }

    fn may_retry(&self, done: u32) -> bool {
        self.config.max_append_retries.is_none_or(|max| done < max)
    }

    /// Append `candidate` only if the tail is still `base`.
    fn commit(&self, base: &Block, candidate: Block) -> Result<Block, LedgerError> {
        let mut chain = self.write();
        let tail = tail_of(&chain);
        if tail.index != base.index || tail.hash != base.hash {
            return Err(LedgerError::StaleTail {
                expected: base.hash.clone(),
                found: tail.hash.clone(),
            });
        }
        self.push_validated(&mut chain, candidate)
    }

    /// Validate an externally built block against the current tail and
    /// append it.
    pub fn submit_block(&self, block: Block) -> Result<Block, LedgerError> {
        let mut chain = self.write();
        self.push_validated(&mut chain, block)
    }

    fn push_validated(
        &self,
        chain: &mut ChainSnapshot,
        candidate: Block,
    ) -> Result<Block, LedgerError> {
        let tail = tail_of(chain.as_slice());
        if let Err(e) = validation::validate_block(&candidate, tail, self.config.difficulty) {
            error!("LEDGER - rejected block #{}: {}", candidate.index, e);
            return Err(e.into());
        }

        // Clones only if a reader still holds the previous snapshot.
        Arc::make_mut(chain).push(candidate.clone());
        info!(
            "LEDGER - appended block #{} hash={} nonce={:?}",
            candidate.index, candidate.hash, candidate.nonce
        );
        debug!("LEDGER - {} blocks, tail {:?}", chain.len(), candidate);
        Ok(candidate)
    }

    /// Fork choice: adopt `candidate` iff it is strictly longer than the
    /// current chain. Returns whether the chain was replaced.
    ///
    /// Only the length is compared. The candidate's blocks are NOT
    /// re-validated, so a longer but broken sequence is adopted as-is; it is
    /// an open question whether full re-validation was ever intended.
    pub fn replace_with(&self, candidate: Vec<Block>) -> bool {
        let mut chain = self.write();
        if candidate.len() > chain.len() {
            info!(
                "LEDGER - replacing chain of {} blocks with {} blocks",
                chain.len(),
                candidate.len()
            );
            *chain = Arc::new(candidate);
            true
        } else {
            debug!(
                "LEDGER - kept chain of {} blocks over candidate of {}",
                chain.len(),
                candidate.len()
            );
            false
        }
    }

    /// Validate the whole current chain: linkage, hashes and PoW.
    pub fn audit(&self) -> Result<(), ChainAuditError> {
        validation::validate_chain(&self.snapshot(), self.config.difficulty)
    }
}

fn tail_of(chain: &[Block]) -> &Block {
    chain
        .last()
        .expect("ledger always holds at least the genesis block")
}
