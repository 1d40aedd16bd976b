use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{normalize_symbol, PriceError, PriceResolver};

/// Deterministic resolver for tests and reproducible runs.
///
/// Symbols registered with [`FixedPriceResolver::with_outage`], or with a
/// price that is not strictly positive, fail with a source error instead of
/// an unknown-symbol error.
#[derive(Debug, Clone, Default)]
pub struct FixedPriceResolver {
    prices: HashMap<String, Decimal>,
    outages: HashSet<String>,
}

impl FixedPriceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(normalize_symbol(symbol), price);
        self
    }

    pub fn with_outage(mut self, symbol: &str) -> Self {
        self.outages.insert(normalize_symbol(symbol));
        self
    }

    /// ETH at 3000, USDC at 1 and WBTC at 65000.
    pub fn reference() -> Self {
        Self::new()
            .with_price("ETH", Decimal::from(3_000))
            .with_price("USDC", Decimal::ONE)
            .with_price("WBTC", Decimal::from(65_000))
    }
}

#[async_trait]
impl PriceResolver for FixedPriceResolver {
    async fn get_price_usd(&self, symbol: &str) -> Result<Decimal, PriceError> {
        let key = normalize_symbol(symbol);
        if self.outages.contains(&key) {
            return Err(PriceError::SourceFailure {
                symbol: key,
                reason: "source unavailable".into(),
            });
        }
        let price = self
            .prices
            .get(&key)
            .copied()
            .ok_or_else(|| PriceError::UnknownSymbol(symbol.to_string()))?;
        if price <= Decimal::ZERO {
            return Err(PriceError::SourceFailure {
                symbol: key,
                reason: "non-positive quote".into(),
            });
        }
        Ok(price)
    }
}
