use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::hasher::{self, Preimage};
use super::pow::{self, CancelToken, Miner, MiningError};

/// A single block in the ledger holding one opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: String, // RFC 3339, UTC
    pub payload: String,
    pub prev_hash: String, // empty for genesis
    pub difficulty: u32,
    pub nonce: String, // Proof-of-Work nonce, empty when difficulty is 0
    pub hash: String,  // Cached hash of the block
}

impl Block {
    /// Every field except `hash`, in canonical order.
    pub fn preimage(&self) -> Preimage<'_> {
        Preimage {
            index: self.index,
            timestamp: &self.timestamp,
            payload: &self.payload,
            prev_hash: &self.prev_hash,
            difficulty: self.difficulty,
            nonce: &self.nonce,
        }
    }

    /// Recompute the hash from the block's content (ignores the cached `hash`).
    pub fn compute_hash(&self) -> String {
        hasher::digest(&self.preimage())
    }

    /// Whether the cached hash satisfies `difficulty`. Does not check integrity.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        pow::meets_difficulty(&self.hash, difficulty)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// A block whose nonce and hash are not decided yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsealedBlock {
    pub index: u64,
    pub timestamp: String,
    pub payload: String,
    pub prev_hash: String,
    pub difficulty: u32,
}

impl UnsealedBlock {
    /// Genesis candidate: index 0, no predecessor, empty payload.
    pub fn genesis(difficulty: u32) -> Self {
        Self {
            index: 0,
            timestamp: now_timestamp(),
            payload: String::new(),
            prev_hash: String::new(),
            difficulty,
        }
    }

    /// Candidate that extends `predecessor`.
    pub fn next(predecessor: &Block, payload: impl Into<String>, difficulty: u32) -> Self {
        Self {
            index: predecessor.index + 1,
            timestamp: now_timestamp(),
            payload: payload.into(),
            prev_hash: predecessor.hash.clone(),
            difficulty,
        }
    }

    pub fn preimage<'a>(&'a self, nonce: &'a str) -> Preimage<'a> {
        Preimage {
            index: self.index,
            timestamp: &self.timestamp,
            payload: &self.payload,
            prev_hash: &self.prev_hash,
            difficulty: self.difficulty,
            nonce,
        }
    }

    pub fn hash_with_nonce(&self, nonce: &str) -> String {
        hasher::digest(&self.preimage(nonce))
    }

    /// Fix the nonce and compute the final hash.
    pub fn seal(self, nonce: String) -> Block {
        let hash = self.hash_with_nonce(&nonce);
        self.into_block(nonce, hash)
    }

    fn into_block(self, nonce: String, hash: String) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            payload: self.payload,
            prev_hash: self.prev_hash,
            difficulty: self.difficulty,
            nonce,
            hash,
        }
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Builds sealed blocks at the ledger's difficulty. Never touches the ledger.
#[derive(Debug, Clone, Copy)]
pub struct BlockFactory {
    difficulty: u32,
    miner: Miner,
}

impl BlockFactory {
    pub fn new(difficulty: u32, miner: Miner) -> Self {
        Self { difficulty, miner }
    }

    /// Create the genesis block (first block in the chain).
    pub fn genesis(&self, cancel: &CancelToken) -> Result<Block, MiningError> {
        self.finish(UnsealedBlock::genesis(self.difficulty), cancel)
    }

    /// Create the block that follows `predecessor`, mining it if the
    /// difficulty requires proof-of-work.
    pub fn create(
        &self,
        predecessor: &Block,
        payload: impl Into<String>,
        cancel: &CancelToken,
    ) -> Result<Block, MiningError> {
        self.finish(
            UnsealedBlock::next(predecessor, payload, self.difficulty),
            cancel,
        )
    }

    fn finish(&self, unsealed: UnsealedBlock, cancel: &CancelToken) -> Result<Block, MiningError> {
        if self.difficulty == 0 {
            return Ok(unsealed.seal(String::new()));
        }
        let solution = self.miner.find_nonce(&unsealed, self.difficulty, cancel)?;
        Ok(unsealed.into_block(solution.nonce, solution.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(difficulty: u32) -> BlockFactory {
        BlockFactory::new(difficulty, Miner::default())
    }

    #[test]
    fn genesis_has_valid_hash() {
        let b = factory(0).genesis(&CancelToken::new()).unwrap();
        assert_eq!(b.index, 0);
        assert_eq!(b.prev_hash, "");
        assert_eq!(b.payload, "");
        assert_eq!(b.nonce, "");
        assert_eq!(b.hash, b.compute_hash());
        assert!(b.is_genesis());
    }

    #[test]
    fn genesis_is_mined_when_difficulty_is_set() {
        let b = factory(2).genesis(&CancelToken::new()).unwrap();
        assert!(b.hash.starts_with("00"));
        assert!(!b.nonce.is_empty());
        assert_eq!(b.hash, b.compute_hash());
    }

    #[test]
    fn create_links_to_predecessor() {
        let f = factory(0);
        let genesis = f.genesis(&CancelToken::new()).unwrap();
        let b = f.create(&genesis, "hello", &CancelToken::new()).unwrap();

        assert_eq!(b.index, 1);
        assert_eq!(b.prev_hash, genesis.hash);
        assert_eq!(b.payload, "hello");
        assert_eq!(b.difficulty, 0);
        assert_eq!(b.nonce, "");
        assert_eq!(b.hash, b.compute_hash());
    }

    #[test]
    fn mining_produces_leading_zeros() {
        let f = factory(2);
        let genesis = f.genesis(&CancelToken::new()).unwrap();
        let b = f.create(&genesis, "payload", &CancelToken::new()).unwrap();
        assert!(b.hash.starts_with("00"));
        assert!(b.meets_difficulty(2));
        assert_eq!(b.hash, b.compute_hash());
    }

    #[test]
    fn invalid_when_mutated() {
        let f = factory(1);
        let genesis = f.genesis(&CancelToken::new()).unwrap();
        let mut b = f.create(&genesis, "original", &CancelToken::new()).unwrap();
        let old_hash = b.hash.clone();

        b.payload.push_str(" (tampered)");

        assert_ne!(old_hash, b.compute_hash());
    }

    #[test]
    fn cancelled_mining_returns_error() {
        let token = CancelToken::new();
        token.cancel();
        let err = factory(1).genesis(&token).unwrap_err();
        assert!(matches!(err, MiningError::Cancelled { .. }));
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let b = factory(0).genesis(&CancelToken::new()).unwrap();
        let json = serde_json::to_value(&b).unwrap();
        for key in ["index", "timestamp", "payload", "prev_hash", "difficulty", "nonce", "hash"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, b);
    }
}
