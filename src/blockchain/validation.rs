use log::warn;
use thiserror::Error;

use std::fmt;

use super::block::Block;
use super::pow::meets_difficulty;

/// The three properties checked for every block after genesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCheck {
    /// Stored hash equals the hash recomputed from the block's fields
    Integrity,
    /// `previous_hash` equals the predecessor's stored hash
    Linkage,
    /// Stored hash has the required number of leading zeros
    Consensus,
}

impl fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationCheck::Integrity => "integrity",
            ValidationCheck::Linkage => "linkage",
            ValidationCheck::Consensus => "consensus",
        };
        f.write_str(name)
    }
}

/// First failure found while auditing a chain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("block at position {position} failed the {check} check")]
pub struct ValidationError {
    /// Position of the failing block in the chain
    pub position: usize,
    pub check: ValidationCheck,
}

/// Audits a chain, stopping at the first failing block
///
/// The block at position 0 is trusted and never checked. Every later block
/// must pass integrity, linkage and consensus, in that order.
pub fn validate_chain(chain: &[Block], difficulty: usize) -> Result<(), ValidationError> {
    for (position, pair) in chain.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let position = position + 1;

        if !current.has_valid_hash() {
            warn!("Invalid hash at block {}", current.index);
            return Err(ValidationError {
                position,
                check: ValidationCheck::Integrity,
            });
        }

        if current.previous_hash != previous.hash {
            warn!(
                "Broken link between {} and {}",
                previous.index, current.index
            );
            return Err(ValidationError {
                position,
                check: ValidationCheck::Linkage,
            });
        }

        if !meets_difficulty(&current.hash, difficulty) {
            warn!(
                "Block {} does not meet proof of work difficulty {}",
                current.index, difficulty
            );
            return Err(ValidationError {
                position,
                check: ValidationCheck::Consensus,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::pow::proof_of_work;
    use crate::blockchain::transaction::Transfer;

    fn build_chain(len: usize, difficulty: usize) -> Vec<Block> {
        let mut chain = vec![Block::genesis()];
        for i in 1..len {
            let tip = &chain[chain.len() - 1];
            let mut block = Block::new(
                i as u64,
                vec![Transfer::reward(format!("miner{}", i), 50.0).into()],
                tip.hash.clone(),
            )
            .unwrap();
            proof_of_work(&mut block, difficulty);
            chain.push(block);
        }
        chain
    }

    #[test]
    fn test_valid_chain() {
        let chain = build_chain(4, 2);
        assert_eq!(validate_chain(&chain, 2), Ok(()));
    }

    #[test]
    fn test_genesis_only_chain_is_valid() {
        let chain = vec![Block::genesis()];
        assert!(validate_chain(&chain, 4).is_ok());
    }

    #[test]
    fn test_genesis_is_not_checked() {
        let mut chain = build_chain(3, 2);
        chain[0].nonce = 99;
        chain[0].timestamp = "tampered".to_string();
        assert!(validate_chain(&chain, 2).is_ok());
    }

    #[test]
    fn test_tampered_field_fails_integrity() {
        let mut chain = build_chain(3, 2);
        chain[2].timestamp = "1970-01-01T00:00:00.000000".to_string();

        assert_eq!(
            validate_chain(&chain, 2),
            Err(ValidationError {
                position: 2,
                check: ValidationCheck::Integrity
            })
        );
    }

    #[test]
    fn test_rehashed_tamper_fails_linkage_downstream() {
        let mut chain = build_chain(3, 1);
        chain[1].nonce += 1;
        let rehashed = chain[1].calculate_hash();
        chain[1].hash = rehashed;

        // Difficulty 0 so only the broken link to block 2 is reported
        let err = validate_chain(&chain, 0).unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(err.check, ValidationCheck::Linkage);
    }

    #[test]
    fn test_unmined_block_fails_consensus() {
        let mut chain = build_chain(2, 2);
        let tip_hash = chain[1].hash.clone();

        // Forge a block that skips the search and lands on a non-qualifying hash
        let mut forged = Block::from_parts(
            2,
            vec![Transfer::reward("forger", 50.0).into()],
            tip_hash,
            "2024-01-01T00:00:00.000000",
            0,
        )
        .unwrap();
        while meets_difficulty(&forged.hash, 2) {
            forged.nonce += 1;
            forged.hash = forged.calculate_hash();
        }
        chain.push(forged);

        assert_eq!(
            validate_chain(&chain, 2),
            Err(ValidationError {
                position: 2,
                check: ValidationCheck::Consensus
            })
        );
    }

    #[test]
    fn test_error_message_names_check() {
        let err = ValidationError {
            position: 3,
            check: ValidationCheck::Linkage,
        };
        assert_eq!(err.to_string(), "block at position 3 failed the linkage check");
    }
}
