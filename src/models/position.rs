use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Length of a `0x`-prefixed 20-byte hex address.
const ADDRESS_LEN: usize = 42;

/// Database row for positions table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub id: i64,
    pub position_id: String,
    pub owner_address: String,
    pub collateral_symbol: String,
    pub collateral_amount: String,
    pub debt_symbol: String,
    pub debt_amount: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Position creation request as received from a client.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePositionRequest {
    pub position_id: String,
    pub owner_address: String,
    pub collateral_symbol: String,
    pub collateral_amount: String,
    pub debt_symbol: String,
    pub debt_amount: String,
}

/// A validated, normalised position ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPosition {
    pub position_id: String,
    pub owner_address: String,
    pub collateral_symbol: String,
    pub collateral_amount: String,
    pub debt_symbol: String,
    pub debt_amount: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionValidationError {
    #[error("position_id cannot be empty")]
    EmptyPositionId,

    #[error("invalid owner_address format")]
    InvalidOwnerAddress,

    #[error("invalid {field} format: '{value}'")]
    InvalidAmount { field: &'static str, value: String },

    #[error("{field} must be positive")]
    NonPositiveAmount { field: &'static str },

    #[error("symbols cannot be empty")]
    EmptySymbol,
}

impl CreatePositionRequest {
    /// Validate and normalise: trimmed id, lower-case owner, upper-case
    /// symbols. Amounts keep their exact text.
    pub fn validate(&self) -> Result<NewPosition, PositionValidationError> {
        let position_id = self.position_id.trim();
        if position_id.is_empty() {
            return Err(PositionValidationError::EmptyPositionId);
        }

        let owner = self.owner_address.trim();
        if !is_hex_address(owner) {
            return Err(PositionValidationError::InvalidOwnerAddress);
        }

        let collateral_amount = self.collateral_amount.trim();
        let debt_amount = self.debt_amount.trim();
        validate_amount("collateral_amount", collateral_amount)?;
        validate_amount("debt_amount", debt_amount)?;

        let collateral_symbol = self.collateral_symbol.trim();
        let debt_symbol = self.debt_symbol.trim();
        if collateral_symbol.is_empty() || debt_symbol.is_empty() {
            return Err(PositionValidationError::EmptySymbol);
        }

        Ok(NewPosition {
            position_id: position_id.to_string(),
            owner_address: owner.to_lowercase(),
            collateral_symbol: collateral_symbol.to_uppercase(),
            collateral_amount: collateral_amount.to_string(),
            debt_symbol: debt_symbol.to_uppercase(),
            debt_amount: debt_amount.to_string(),
        })
    }
}

fn is_hex_address(s: &str) -> bool {
    s.len() == ADDRESS_LEN
        && s.starts_with("0x")
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn validate_amount(field: &'static str, value: &str) -> Result<(), PositionValidationError> {
    let amount = Decimal::from_str(value).map_err(|_| PositionValidationError::InvalidAmount {
        field,
        value: value.to_string(),
    })?;
    if amount <= Decimal::ZERO {
        return Err(PositionValidationError::NonPositiveAmount { field });
    }
    Ok(())
}
