use log::info;
use serde_json::Value;
use thiserror::Error;

use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use super::block::{Block, BlockError};
use super::pow::{proof_of_work, search, MiningBudget, SearchOutcome};
use super::transaction::{Transaction, TransactionError, Transfer, NETWORK_SENDER};
use super::validation::{validate_chain, ValidationError};
use crate::config::LedgerConfig;

/// Errors that can occur during ledger operations
#[derive(Debug, Error, PartialEq)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Block error: {0}")]
    BlockError(#[from] BlockError),
}

/// Result of a request to seal the pending transactions
#[derive(Debug, Clone, PartialEq)]
pub enum MineOutcome {
    /// The block that was sealed and appended
    Sealed(Block),

    /// The pending queue was empty; nothing changed
    NoPendingWork,

    /// A bounded search gave up; the chain and pending queue are unchanged
    BudgetExhausted { attempts: u64 },
}

impl MineOutcome {
    pub fn sealed(&self) -> Option<&Block> {
        match self {
            MineOutcome::Sealed(block) => Some(block),
            _ => None,
        }
    }
}

/// Single-node proof of work ledger
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Confirmed blocks, genesis first
    chain: Vec<Block>,

    /// Transfers waiting for the next block
    pending_transactions: Vec<Transfer>,

    /// Mining difficulty (number of leading zeros required in hash)
    difficulty: usize,

    /// Mining reward
    mining_reward: f64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Creates a new ledger with a genesis block and default parameters
    pub fn new() -> Self {
        Self::with_config(&LedgerConfig::default())
    }

    pub fn with_config(config: &LedgerConfig) -> Self {
        Self::with_params(config.difficulty, config.mining_reward)
    }

    /// Creates a new ledger with a genesis block
    ///
    /// # Arguments
    ///
    /// * `difficulty` - Leading zero hex characters required in a block hash
    /// * `mining_reward` - Amount paid to the beneficiary of every sealed block
    pub fn with_params(difficulty: usize, mining_reward: f64) -> Self {
        Ledger {
            chain: vec![Block::genesis()],
            pending_transactions: Vec::new(),
            difficulty,
            mining_reward,
        }
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> &Block {
        // The chain always holds at least the genesis block
        &self.chain[self.chain.len() - 1]
    }

    /// Confirmed blocks in order, genesis first
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.chain.iter()
    }

    pub fn pending_transactions(&self) -> &[Transfer] {
        &self.pending_transactions
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Changes the difficulty used for sealing and validation
    ///
    /// Validation reads the live value, so raising it can invalidate blocks
    /// sealed earlier.
    pub fn set_difficulty(&mut self, difficulty: usize) {
        self.difficulty = difficulty;
    }

    pub fn mining_reward(&self) -> f64 {
        self.mining_reward
    }

    /// Adds a new transfer to the pending transactions
    ///
    /// No balance check is made; overspending shows up only in balances.
    ///
    /// # Returns
    ///
    /// Result with the index of the block that will include this transaction
    pub fn add_transaction(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: f64,
    ) -> Result<u64, BlockchainError> {
        let transfer = Transfer::new(sender, recipient, amount)?;
        self.submit(transfer)
    }

    /// Queues an already built transfer
    ///
    /// The reward sender is reserved for payouts built while sealing.
    pub fn submit(&mut self, transfer: Transfer) -> Result<u64, BlockchainError> {
        transfer.validate()?;

        if transfer.is_reward() {
            return Err(TransactionError::InvalidTransaction(format!(
                "sender `{}` is reserved for mining rewards",
                NETWORK_SENDER
            ))
            .into());
        }

        self.pending_transactions.push(transfer);

        Ok(self.last_block().index + 1)
    }

    /// Queues a loosely shaped record with `from`, `to` and `amount` keys
    pub fn add_record(&mut self, record: &Value) -> Result<u64, BlockchainError> {
        let transfer = Transfer::from_value(record)?;
        self.submit(transfer)
    }

    /// Seals the pending transactions into a new block
    ///
    /// Runs an unbounded proof of work search. The pending queue is cleared
    /// only once the block is sealed and appended.
    ///
    /// # Arguments
    ///
    /// * `beneficiary` - Identifier receiving the mining reward
    pub fn mine_pending_transactions(
        &mut self,
        beneficiary: &str,
    ) -> Result<MineOutcome, BlockchainError> {
        let mut candidate = match self.candidate_block(beneficiary)? {
            Some(block) => block,
            None => return Ok(MineOutcome::NoPendingWork),
        };

        let start = Instant::now();
        proof_of_work(&mut candidate, self.difficulty);
        let elapsed = start.elapsed();

        info!(
            "Block {} mined: {} (nonce={}, time={:.2}s)",
            candidate.index,
            candidate.hash,
            candidate.nonce,
            elapsed.as_secs_f64()
        );

        Ok(MineOutcome::Sealed(self.append(candidate)))
    }

    /// Seals the pending transactions, giving up when the budget runs out
    ///
    /// Unlike [`Ledger::mine_pending_transactions`] this may return
    /// `BudgetExhausted`, in which case nothing is appended and the pending
    /// queue is kept. A set `cancel` flag stops the search at the next attempt.
    pub fn mine_pending_transactions_within(
        &mut self,
        beneficiary: &str,
        budget: &MiningBudget,
        cancel: Option<&AtomicBool>,
    ) -> Result<MineOutcome, BlockchainError> {
        let mut candidate = match self.candidate_block(beneficiary)? {
            Some(block) => block,
            None => return Ok(MineOutcome::NoPendingWork),
        };

        match search(&mut candidate, self.difficulty, budget, cancel) {
            SearchOutcome::Found {
                attempts, duration, ..
            } => {
                info!(
                    "Block {} mined: {} (nonce={}, attempts={}, time={:.2}s)",
                    candidate.index,
                    candidate.hash,
                    candidate.nonce,
                    attempts,
                    duration.as_secs_f64()
                );
                Ok(MineOutcome::Sealed(self.append(candidate)))
            }
            SearchOutcome::Exhausted { attempts, duration } => {
                info!(
                    "Gave up mining block {} after {} attempts ({:.2}s)",
                    candidate.index,
                    attempts,
                    duration.as_secs_f64()
                );
                Ok(MineOutcome::BudgetExhausted { attempts })
            }
        }
    }

    /// Builds the unsealed block for the current pending queue
    fn candidate_block(&self, beneficiary: &str) -> Result<Option<Block>, BlockchainError> {
        if self.pending_transactions.is_empty() {
            info!("No transactions to mine.");
            return Ok(None);
        }

        let reward = Transfer::reward(beneficiary, self.mining_reward);
        reward.validate()?;

        let mut transactions: Vec<Transaction> = self
            .pending_transactions
            .iter()
            .cloned()
            .map(Transaction::from)
            .collect();
        transactions.push(reward.into());

        let tip = self.last_block();
        let block = Block::new(tip.index + 1, transactions, tip.hash.clone())?;

        info!(
            "Mining block {} with {} txs ... (difficulty={})",
            block.index,
            block.transactions.len(),
            self.difficulty
        );

        Ok(Some(block))
    }

    /// Appends a sealed block and clears the pending queue
    fn append(&mut self, block: Block) -> Block {
        self.chain.push(block.clone());
        self.pending_transactions.clear();
        block
    }

    /// Audits the chain and reports the first failing block and check
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_chain(&self.chain, self.difficulty)
    }

    /// Validates the blockchain
    ///
    /// # Returns
    ///
    /// true if every block after genesis passes integrity, linkage and
    /// consensus checks against the current difficulty
    pub fn is_chain_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Confirmed balance of an identifier
    ///
    /// Replays every confirmed block. Pending transfers are ignored and
    /// reward payouts do not debit their sender.
    pub fn get_balance_of_address(&self, address: &str) -> f64 {
        let mut balance = 0.0;

        for transfer in self.confirmed_transfers() {
            if transfer.from == address && !transfer.is_reward() {
                balance -= transfer.amount;
            }
            if transfer.to == address {
                balance += transfer.amount;
            }
        }

        balance
    }

    /// Every identifier appearing as sender or recipient in the chain
    pub fn addresses(&self) -> BTreeSet<String> {
        let mut addresses = BTreeSet::new();
        for transfer in self.confirmed_transfers() {
            addresses.insert(transfer.from.clone());
            addresses.insert(transfer.to.clone());
        }
        addresses
    }

    fn confirmed_transfers(&self) -> impl Iterator<Item = &Transfer> {
        self.chain
            .iter()
            .flat_map(|block| block.transactions.iter())
            .filter_map(Transaction::as_transfer)
    }
}
