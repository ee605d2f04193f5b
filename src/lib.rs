//! Single-node append-only ledger secured by a proof of work puzzle.
//!
//! The [`Ledger`] queues transfers, seals them into blocks whose hash has a
//! required number of leading zero hex characters, audits the chain for
//! tampering and derives balances by replaying confirmed history.

pub mod blockchain;
pub mod config;

pub use blockchain::{Block, BlockchainError, Ledger, MineOutcome, SharedLedger, Transfer};
pub use config::LedgerConfig;
