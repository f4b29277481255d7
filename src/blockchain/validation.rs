use thiserror::Error;

use super::block::Block;

/// Why a block cannot extend its claimed predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("index mismatch: expected {expected}, found {found}")]
    IndexMismatch { expected: u64, found: u64 },
    #[error("linkage mismatch: prev_hash {found} does not match predecessor hash {expected}")]
    LinkageMismatch { expected: String, found: String },
    #[error("hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch { stored: String, computed: String },
    #[error("difficulty mismatch: block claims {found}, ledger requires {expected}")]
    DifficultyMismatch { expected: u32, found: u32 },
    #[error("difficulty not met: hash {hash} lacks {difficulty} leading zeros")]
    DifficultyNotMet { difficulty: u32, hash: String },
    #[error("invalid genesis block")]
    InvalidGenesis,
}

impl ValidationError {
    /// Short, stable name of the failed check.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IndexMismatch { .. } => "index mismatch",
            Self::LinkageMismatch { .. } => "linkage mismatch",
            Self::HashMismatch { .. } => "hash mismatch",
            Self::DifficultyMismatch { .. } => "difficulty mismatch",
            Self::DifficultyNotMet { .. } => "difficulty not met",
            Self::InvalidGenesis => "invalid genesis",
        }
    }
}

/// A whole-chain audit failure and the index where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainAuditError {
    #[error("chain is empty")]
    Empty,
    #[error("block #{position}: {source}")]
    Block {
        position: usize,
        #[source]
        source: ValidationError,
    },
}

/// Check that `candidate` may follow `predecessor`. Stops at the first failure,
/// in order: index, linkage, hash integrity, difficulty.
pub fn validate_block(
    candidate: &Block,
    predecessor: &Block,
    difficulty: u32,
) -> Result<(), ValidationError> {
    let expected = predecessor.index + 1;
    if candidate.index != expected {
        return Err(ValidationError::IndexMismatch {
            expected,
            found: candidate.index,
        });
    }

    if candidate.prev_hash != predecessor.hash {
        return Err(ValidationError::LinkageMismatch {
            expected: predecessor.hash.clone(),
            found: candidate.prev_hash.clone(),
        });
    }

    check_hash(candidate, difficulty)
}

/// Genesis has no predecessor: index 0, empty prev_hash, intact hash.
pub fn validate_genesis(block: &Block, difficulty: u32) -> Result<(), ValidationError> {
    if block.index != 0 || !block.prev_hash.is_empty() {
        return Err(ValidationError::InvalidGenesis);
    }
    check_hash(block, difficulty)
}

/// Validate the entire chain: genesis, linkage, hashes and PoW.
pub fn validate_chain(blocks: &[Block], difficulty: u32) -> Result<(), ChainAuditError> {
    let genesis = blocks.first().ok_or(ChainAuditError::Empty)?;
    validate_genesis(genesis, difficulty)
        .map_err(|source| ChainAuditError::Block { position: 0, source })?;

    for (position, pair) in blocks.windows(2).enumerate() {
        validate_block(&pair[1], &pair[0], difficulty).map_err(|source| ChainAuditError::Block {
            position: position + 1,
            source,
        })?;
    }
    Ok(())
}

fn check_hash(block: &Block, difficulty: u32) -> Result<(), ValidationError> {
    let computed = block.compute_hash();
    if computed != block.hash {
        return Err(ValidationError::HashMismatch {
            stored: block.hash.clone(),
            computed,
        });
    }

    if block.difficulty != difficulty {
        return Err(ValidationError::DifficultyMismatch {
            expected: difficulty,
            found: block.difficulty,
        });
    }

    if !block.meets_difficulty(difficulty) {
        return Err(ValidationError::DifficultyNotMet {
            difficulty,
            hash: block.hash.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::block::{BlockFactory, UnsealedBlock};
    use crate::blockchain::pow::{CancelToken, Miner};

    fn chain(difficulty: u32, len: usize) -> Vec<Block> {
        let f = BlockFactory::new(difficulty, Miner::default());
        let mut blocks = vec![f.genesis(&CancelToken::new()).unwrap()];
        for i in 1..len {
            let next = f
                .create(&blocks[i - 1], format!("payload-{i}"), &CancelToken::new())
                .unwrap();
            blocks.push(next);
        }
        blocks
    }

    #[test]
    fn accepts_well_formed_successor() {
        let blocks = chain(1, 2);
        assert_eq!(validate_block(&blocks[1], &blocks[0], 1), Ok(()));
    }

    #[test]
    fn rejects_wrong_index() {
        let blocks = chain(0, 2);
        let mut bad = blocks[1].clone();
        bad.index = 5;
        bad.hash = bad.compute_hash();
        assert_eq!(
            validate_block(&bad, &blocks[0], 0),
            Err(ValidationError::IndexMismatch {
                expected: 1,
                found: 5
            })
        );
    }

    #[test]
    fn rejects_broken_linkage() {
        let blocks = chain(0, 2);
        let mut bad = blocks[1].clone();
        bad.prev_hash = "deadbeef".into();
        bad.hash = bad.compute_hash();
        let err = validate_block(&bad, &blocks[0], 0).unwrap_err();
        assert_eq!(err.kind(), "linkage mismatch");
    }

    #[test]
    fn rejects_tampered_payload() {
        let blocks = chain(0, 2);
        let mut bad = blocks[1].clone();
        bad.payload = "forged".into();
        let err = validate_block(&bad, &blocks[0], 0).unwrap_err();
        assert!(matches!(err, ValidationError::HashMismatch { .. }));
    }

    #[test]
    fn rejects_insufficient_work() {
        let blocks = chain(0, 1);
        // Find a nonce whose hash does not start with '0'.
        let unsealed = UnsealedBlock::next(&blocks[0], "lazy", 1);
        let nonce = (0u64..)
            .map(|n| format!("{n:x}"))
            .find(|n| !unsealed.hash_with_nonce(n).starts_with('0'))
            .unwrap();
        let bad = unsealed.seal(nonce);

        let err = validate_block(&bad, &blocks[0], 1).unwrap_err();
        assert!(matches!(err, ValidationError::DifficultyNotMet { difficulty: 1, .. }));
    }

    #[test]
    fn rejects_block_claiming_lower_difficulty() {
        let blocks = chain(1, 1);
        // Difficulty-0 block whose hash happens to carry one leading zero.
        let bad = (0u64..)
            .map(|n| UnsealedBlock::next(&blocks[0], format!("cheap-{n}"), 0).seal(String::new()))
            .find(|b| b.hash.starts_with('0'))
            .unwrap();

        assert_eq!(
            validate_block(&bad, &blocks[0], 1),
            Err(ValidationError::DifficultyMismatch {
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn index_is_checked_before_linkage() {
        let blocks = chain(0, 2);
        let mut bad = blocks[1].clone();
        bad.index = 9;
        bad.prev_hash = "other".into();
        let err = validate_block(&bad, &blocks[0], 0).unwrap_err();
        assert_eq!(err.kind(), "index mismatch");
    }

    #[test]
    fn whole_chain_audit() {
        let mut blocks = chain(1, 4);
        assert_eq!(validate_chain(&blocks, 1), Ok(()));

        blocks[2].payload = "rewritten".into();
        match validate_chain(&blocks, 1) {
            Err(ChainAuditError::Block { position, source }) => {
                assert_eq!(position, 2);
                assert_eq!(source.kind(), "hash mismatch");
            }
            other => panic!("unexpected audit result: {other:?}"),
        }

        assert_eq!(validate_chain(&[], 1), Err(ChainAuditError::Empty));
    }

    #[test]
    fn genesis_must_have_no_predecessor() {
        let mut blocks = chain(0, 1);
        blocks[0].prev_hash = "something".into();
        assert_eq!(
            validate_genesis(&blocks[0], 0),
            Err(ValidationError::InvalidGenesis)
        );
    }
}
