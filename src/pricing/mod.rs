//! USD price lookup for position legs.

pub mod fixed;
pub mod static_oracle;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

pub use fixed::FixedPriceResolver;
pub use static_oracle::StaticPriceOracle;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PriceError {
    /// No configured source knows the symbol.
    #[error("no price for {0}")]
    UnknownSymbol(String),

    /// The source knows the symbol but could not produce a price.
    #[error("price source failed for {symbol}: {reason}")]
    SourceFailure { symbol: String, reason: String },

    #[error("price lookup for {0} timed out")]
    Timeout(String),
}

impl PriceError {
    /// True when the failure stems from the caller's symbol rather than the
    /// price infrastructure.
    pub fn is_unknown_symbol(&self) -> bool {
        matches!(self, PriceError::UnknownSymbol(_))
    }
}

/// Maps an asset ticker to its current USD unit price.
///
/// Tickers are case-insensitive and returned prices are strictly positive.
/// Implementations must be callable concurrently from many tasks.
#[async_trait]
pub trait PriceResolver: Send + Sync {
    async fn get_price_usd(&self, symbol: &str) -> Result<Decimal, PriceError>;
}

/// Normalise a ticker for table lookups.
pub(crate) fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
