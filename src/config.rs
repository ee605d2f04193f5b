//! Ledger configuration

use serde::Deserialize;
use thiserror::Error;

use std::fs;
use std::path::Path;

use crate::blockchain::MiningBudget;

pub const DEFAULT_DIFFICULTY: usize = 4;
pub const DEFAULT_MINING_REWARD: f64 = 50.0;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LedgerConfig {
    /// Leading zero hex characters required in a block hash
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,

    /// Amount paid to the beneficiary of every sealed block
    #[serde(default = "default_mining_reward")]
    pub mining_reward: f64,

    /// Limits applied by drivers that mine with a budget
    #[serde(default)]
    pub budget: MiningBudget,
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_mining_reward() -> f64 {
    DEFAULT_MINING_REWARD
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
            budget: MiningBudget::default(),
        }
    }
}

impl LedgerConfig {
    /// Loads and validates a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.mining_reward.is_finite() || self.mining_reward < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "mining_reward must be a non-negative number: {}",
                self.mining_reward
            )));
        }

        // A SHA-256 hex digest has 64 characters
        if self.difficulty > 64 {
            return Err(ConfigError::Invalid(format!(
                "difficulty {} exceeds the 64 hex characters of a hash",
                self.difficulty
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::from_json("{}").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.mining_reward, 50.0);
        assert!(config.budget.is_unbounded());
    }

    #[test]
    fn test_overrides() {
        let config = LedgerConfig::from_json(
            r#"{"difficulty": 2, "mining_reward": 12.5, "budget": {"max_attempts": 1000}}"#,
        )
        .unwrap();

        assert_eq!(config.difficulty, 2);
        assert_eq!(config.mining_reward, 12.5);
        assert_eq!(config.budget.max_attempts, Some(1000));
        assert_eq!(config.budget.max_duration_ms, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            LedgerConfig::from_json(r#"{"mining_reward": -1}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json(r#"{"difficulty": 65}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = LedgerConfig::from_file("/nonexistent/ledger-config.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
