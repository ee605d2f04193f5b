// Blockchain module
//
// This module contains the ledger core:
// - Transaction records
// - Block structure and hashing
// - Proof of work search
// - Chain validation
// - The Ledger and its shared handle

pub mod block;
pub mod chain;
pub mod pow;
pub mod shared;
pub mod transaction;
pub mod validation;

// Re-export main components for easier access
pub use block::{Block, BlockError};
pub use chain::{BlockchainError, Ledger, MineOutcome};
pub use pow::{MiningBudget, SearchOutcome};
pub use shared::SharedLedger;
pub use transaction::{Transaction, TransactionError, Transfer, NETWORK_SENDER};
pub use validation::{ValidationCheck, ValidationError};
