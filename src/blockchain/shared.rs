use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::block::Block;
use super::chain::{BlockchainError, Ledger, MineOutcome};

/// Ledger handle that can be cloned across threads
///
/// Every operation holds one lock for its whole duration, so a seal covers
/// snapshot, search, append and clear without any intake in between.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    ledger: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        SharedLedger {
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        // Ledger methods never leave partial state behind, so a poisoned
        // lock still guards a consistent ledger
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_transaction(
        &self,
        sender: &str,
        recipient: &str,
        amount: f64,
    ) -> Result<u64, BlockchainError> {
        self.lock().add_transaction(sender, recipient, amount)
    }

    pub fn mine_pending_transactions(
        &self,
        beneficiary: &str,
    ) -> Result<MineOutcome, BlockchainError> {
        self.lock().mine_pending_transactions(beneficiary)
    }

    pub fn is_chain_valid(&self) -> bool {
        self.lock().is_chain_valid()
    }

    pub fn get_balance_of_address(&self, address: &str) -> f64 {
        self.lock().get_balance_of_address(address)
    }

    /// Gets a copy of the entire chain
    pub fn get_chain(&self) -> Vec<Block> {
        self.lock().chain().to_vec()
    }

    /// Runs `f` with exclusive access to the ledger
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        f(&mut self.lock())
    }
}
