use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use std::fmt;

/// Sender used for mining reward payouts. Rewards credit the recipient
/// without debiting this identifier.
pub const NETWORK_SENDER: &str = "network";

/// Errors that can occur during transaction intake
#[derive(Debug, Error, PartialEq)]
pub enum TransactionError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
}

/// A value transfer between two identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Sender's identifier
    pub from: String,

    /// Recipient's identifier
    pub to: String,

    /// Amount being transferred
    pub amount: f64,
}

impl Transfer {
    /// Creates a new transfer
    ///
    /// # Arguments
    ///
    /// * `from` - The sender's identifier
    /// * `to` - The recipient's identifier
    /// * `amount` - The amount to transfer, finite and non-negative
    ///
    /// # Returns
    ///
    /// The transfer, or `InvalidTransaction` if a field is missing or malformed
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: f64,
    ) -> Result<Self, TransactionError> {
        let transfer = Transfer {
            from: from.into(),
            to: to.into(),
            amount,
        };
        transfer.validate()?;
        Ok(transfer)
    }

    /// Creates the reward payout for a miner
    pub fn reward(beneficiary: impl Into<String>, amount: f64) -> Self {
        Transfer {
            from: NETWORK_SENDER.to_string(),
            to: beneficiary.into(),
            amount,
        }
    }

    /// Builds a transfer from a loosely shaped record
    ///
    /// The record must be an object carrying `from`, `to` and `amount`.
    /// Extra keys are ignored.
    pub fn from_value(record: &Value) -> Result<Self, TransactionError> {
        let object = record.as_object().ok_or_else(|| {
            TransactionError::InvalidTransaction("record is not an object".to_string())
        })?;

        let field = |key: &str| {
            object.get(key).ok_or_else(|| {
                TransactionError::InvalidTransaction(format!("missing field `{}`", key))
            })
        };

        let from = field("from")?.as_str().ok_or_else(|| {
            TransactionError::InvalidTransaction("`from` must be a string".to_string())
        })?;
        let to = field("to")?.as_str().ok_or_else(|| {
            TransactionError::InvalidTransaction("`to` must be a string".to_string())
        })?;
        let amount = field("amount")?.as_f64().ok_or_else(|| {
            TransactionError::InvalidTransaction("`amount` must be a number".to_string())
        })?;

        Transfer::new(from, to, amount)
    }

    /// Checks that every required field is present and well formed
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.from.is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "sender is missing".to_string(),
            ));
        }

        if self.to.is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "recipient is missing".to_string(),
            ));
        }

        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(TransactionError::InvalidTransaction(format!(
                "amount must be a non-negative number: {}",
                self.amount
            )));
        }

        Ok(())
    }

    /// Checks if the transfer is a mining reward payout
    pub fn is_reward(&self) -> bool {
        self.from == NETWORK_SENDER
    }
}

/// Marker record occupying the genesis block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisMarker {
    pub genesis: bool,
}

/// A record stored in a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transaction {
    Transfer(Transfer),
    Genesis(GenesisMarker),
}

impl Transaction {
    /// The sentinel record placed in the genesis block
    pub fn genesis() -> Self {
        Transaction::Genesis(GenesisMarker { genesis: true })
    }

    /// Returns the transfer if this record moves value
    pub fn as_transfer(&self) -> Option<&Transfer> {
        match self {
            Transaction::Transfer(transfer) => Some(transfer),
            Transaction::Genesis(_) => None,
        }
    }
}

impl From<Transfer> for Transaction {
    fn from(transfer: Transfer) -> Self {
        Transaction::Transfer(transfer)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transaction::Transfer(t) => write!(f, "{} -> {}: {}", t.from, t.to, t.amount),
            Transaction::Genesis(_) => write!(f, "genesis"),
        }
    }
}
