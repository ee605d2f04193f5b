use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::fmt;

use super::transaction::Transaction;

/// Previous hash recorded by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Errors that can occur while constructing a block
#[derive(Debug, Error, PartialEq)]
pub enum BlockError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Represents a block in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Index of the block in the chain
    pub index: u64,

    /// Records included in this block, in insertion order
    pub transactions: Vec<Transaction>,

    /// Hash of the previous block
    pub previous_hash: String,

    /// ISO-8601 creation time
    pub timestamp: String,

    /// Search variable for proof of work
    pub nonce: u64,

    /// Hash over every other field
    pub hash: String,
}

/// Current UTC time in ISO-8601 form, e.g. `2024-05-01T09:30:12.123456`
pub fn current_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

impl Block {
    /// Creates a new block stamped with the current time and nonce 0
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The records to include, never empty
    /// * `previous_hash` - The hash of the previous block
    ///
    /// # Returns
    ///
    /// A new Block with its hash already computed
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
    ) -> Result<Self, BlockError> {
        Block::from_parts(index, transactions, previous_hash, current_timestamp(), 0)
    }

    /// Creates a block from explicit field values
    ///
    /// Two blocks built from equal parts always carry equal hashes.
    pub fn from_parts(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        timestamp: impl Into<String>,
        nonce: u64,
    ) -> Result<Self, BlockError> {
        if transactions.is_empty() {
            return Err(BlockError::InvalidArgument(format!(
                "block {} has no transactions",
                index
            )));
        }

        let block = Block {
            index,
            transactions,
            previous_hash: previous_hash.into(),
            timestamp: timestamp.into(),
            nonce,
            hash: String::new(),
        };

        let hash = block.calculate_hash();

        Ok(Block { hash, ..block })
    }

    /// Creates the genesis block holding a single marker record
    pub fn genesis() -> Self {
        let block = Block {
            index: 0,
            transactions: vec![Transaction::genesis()],
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            timestamp: current_timestamp(),
            nonce: 0,
            hash: String::new(),
        };

        let hash = block.calculate_hash();

        Block { hash, ..block }
    }

    /// Canonical serialization of the hashed fields
    ///
    /// Compact JSON with object keys sorted at every level. The stored
    /// `hash` is not part of it.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let block_data = serde_json::json!({
            "index": self.index,
            "transactions": self.transactions,
            "previous_hash": self.previous_hash,
            "timestamp": self.timestamp,
            "nonce": self.nonce,
        });

        sort_keys(block_data).to_string().into_bytes()
    }

    /// Calculates the hash of the block from its current fields
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the canonical serialization as a hexadecimal string
    pub fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Checks that the stored hash matches the current fields
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }
}

/// Rebuilds every object with its keys in lexicographic order
///
/// `serde_json::Map` is already key-ordered unless the `preserve_order`
/// feature gets enabled somewhere in the dependency graph; this keeps the
/// hash stable if it does.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Block {} ---", self.index)?;
        writeln!(f, "Timestamp: {}", self.timestamp)?;
        writeln!(f, "Previous: {}", self.previous_hash)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        writeln!(f, "Hash: {}", self.hash)?;
        writeln!(f, "Transactions:")?;
        for transaction in &self.transactions {
            writeln!(f, "  {}", transaction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::transaction::Transfer;

    fn sample_transactions() -> Vec<Transaction> {
        vec![
            Transfer::new("alice", "bob", 10.0).unwrap().into(),
            Transfer::reward("miner1", 50.0).into(),
        ]
    }

    #[test]
    fn test_new_block() {
        let block = Block::new(1, sample_transactions(), "previous_hash").unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.nonce, 0);
        assert_eq!(block.previous_hash, "previous_hash");
        assert_eq!(block.hash.len(), 64); // SHA-256 hash is 64 characters in hex
        assert!(block.has_valid_hash());
    }

    #[test]
    fn test_empty_transactions_rejected() {
        let result = Block::new(1, Vec::new(), "previous_hash");
        assert!(matches!(result, Err(BlockError::InvalidArgument(_))));
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis();

        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.transactions, vec![Transaction::genesis()]);
        assert!(genesis.has_valid_hash());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = Block::from_parts(3, sample_transactions(), "abc", "2024-01-01T00:00:00.000000", 7)
            .unwrap();
        let b = Block::from_parts(3, sample_transactions(), "abc", "2024-01-01T00:00:00.000000", 7)
            .unwrap();

        assert_eq!(a.hash, b.hash);
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn test_canonical_keys_sorted() {
        let block = Block::from_parts(1, sample_transactions(), "abc", "ts", 0).unwrap();
        let canonical = String::from_utf8(block.canonical_bytes()).unwrap();

        assert_eq!(
            canonical,
            "{\"index\":1,\"nonce\":0,\"previous_hash\":\"abc\",\"timestamp\":\"ts\",\
             \"transactions\":[{\"amount\":10.0,\"from\":\"alice\",\"to\":\"bob\"},\
             {\"amount\":50.0,\"from\":\"network\",\"to\":\"miner1\"}]}"
        );
    }

    #[test]
    fn test_any_field_change_changes_hash() {
        let block = Block::from_parts(1, sample_transactions(), "abc", "ts", 0).unwrap();

        let mut nonce = block.clone();
        nonce.nonce += 1;
        assert_ne!(nonce.calculate_hash(), block.hash);

        let mut timestamp = block.clone();
        timestamp.timestamp = "other".to_string();
        assert_ne!(timestamp.calculate_hash(), block.hash);

        let mut previous = block.clone();
        previous.previous_hash = "abd".to_string();
        assert_ne!(previous.calculate_hash(), block.hash);

        let mut transactions = block.clone();
        transactions.transactions.pop();
        assert_ne!(transactions.calculate_hash(), block.hash);

        // Recomputing does not touch the stored hash
        assert!(!nonce.has_valid_hash());
        assert_eq!(nonce.hash, block.hash);
    }
}
