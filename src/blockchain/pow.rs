//! Proof of work search

use log::debug;
use serde::{Deserialize, Serialize};

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::block::Block;

/// Attempts between progress log lines
const PROGRESS_INTERVAL: u64 = 100_000;

/// Checks if a hex hash starts with `difficulty` zero characters
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Limits for a bounded search
///
/// An empty budget never stops the search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningBudget {
    /// Maximum number of hashes to try
    #[serde(default)]
    pub max_attempts: Option<u64>,

    /// Maximum wall-clock time in milliseconds
    #[serde(default)]
    pub max_duration_ms: Option<u64>,
}

impl MiningBudget {
    /// A budget with no limits
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration_ms = Some(duration.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.max_duration_ms.is_none()
    }

    fn exhausted(&self, attempts: u64, started: Instant) -> bool {
        if let Some(max) = self.max_attempts {
            if attempts >= max {
                return true;
            }
        }

        if let Some(ms) = self.max_duration_ms {
            if started.elapsed() >= Duration::from_millis(ms) {
                return true;
            }
        }

        false
    }
}

/// Result of a proof of work search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// A qualifying hash was found; the block holds the winning nonce
    Found {
        hash: String,
        attempts: u64,
        duration: Duration,
    },

    /// The budget ran out or the search was cancelled
    Exhausted { attempts: u64, duration: Duration },
}

/// Searches for a nonce whose hash has `difficulty` leading zeros
///
/// Starts at the block's current nonce and counts up by one. Never returns
/// if no such nonce exists.
///
/// # Returns
///
/// The winning hash; `block.nonce` and `block.hash` hold the winning values
pub fn proof_of_work(block: &mut Block, difficulty: usize) -> String {
    loop {
        block.hash = block.calculate_hash();

        if meets_difficulty(&block.hash, difficulty) {
            return block.hash.clone();
        }

        block.nonce += 1;
    }
}

/// Bounded variant of [`proof_of_work`]
///
/// The budget and the cancel flag are checked once per attempt, before
/// hashing. On exhaustion the block keeps the next untried nonce with its
/// hash refreshed to match.
pub fn search(
    block: &mut Block,
    difficulty: usize,
    budget: &MiningBudget,
    cancel: Option<&AtomicBool>,
) -> SearchOutcome {
    let started = Instant::now();
    let mut attempts = 0u64;

    loop {
        if budget.exhausted(attempts, started)
            || cancel.map_or(false, |flag| flag.load(Ordering::Relaxed))
        {
            block.hash = block.calculate_hash();
            return SearchOutcome::Exhausted {
                attempts,
                duration: started.elapsed(),
            };
        }

        block.hash = block.calculate_hash();
        attempts += 1;

        if meets_difficulty(&block.hash, difficulty) {
            return SearchOutcome::Found {
                hash: block.hash.clone(),
                attempts,
                duration: started.elapsed(),
            };
        }

        if attempts % PROGRESS_INTERVAL == 0 {
            let elapsed = started.elapsed();
            debug!(
                "Mining block {}: {} attempts ({:.1} KH/s)",
                block.index,
                attempts,
                attempts as f64 / elapsed.as_secs_f64().max(f64::EPSILON) / 1000.0
            );
        }

        block.nonce += 1;
    }
}
