use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;

use super::{normalize_symbol, PriceError, PriceResolver};

/// Reference price table with optional simulated volatility.
///
/// The table is immutable after construction. Jitter draws from the
/// thread-local RNG, so no lock is shared between callers.
#[derive(Debug, Clone)]
pub struct StaticPriceOracle {
    prices: HashMap<String, Decimal>,
    jitter_bps: u32,
}

impl Default for StaticPriceOracle {
    fn default() -> Self {
        Self::new([
            ("ETH", Decimal::from(3_000)),
            ("USDC", Decimal::ONE),
            ("WBTC", Decimal::from(65_000)),
        ])
    }
}

impl StaticPriceOracle {
    pub fn new<'a>(prices: impl IntoIterator<Item = (&'a str, Decimal)>) -> Self {
        Self {
            prices: prices
                .into_iter()
                .map(|(symbol, price)| (normalize_symbol(symbol), price))
                .collect(),
            jitter_bps: 0,
        }
    }

    /// Apply up to `±jitter_bps` of random movement to every quote.
    /// Values are clamped below 100% so prices stay positive.
    pub fn with_jitter_bps(mut self, jitter_bps: u32) -> Self {
        self.jitter_bps = jitter_bps.min(9_999);
        self
    }

    fn jittered(&self, base: Decimal) -> Decimal {
        if self.jitter_bps == 0 {
            return base;
        }
        let bound = i64::from(self.jitter_bps);
        let offset_bps = rand::thread_rng().gen_range(-bound..=bound);
        base * (Decimal::ONE + Decimal::new(offset_bps, 4))
    }
}

#[async_trait]
impl PriceResolver for StaticPriceOracle {
    async fn get_price_usd(&self, symbol: &str) -> Result<Decimal, PriceError> {
        let key = normalize_symbol(symbol);
        let base = self
            .prices
            .get(&key)
            .copied()
            .ok_or_else(|| PriceError::UnknownSymbol(symbol.to_string()))?;

        let price = self.jittered(base);
        if price <= Decimal::ZERO {
            return Err(PriceError::SourceFailure {
                symbol: key,
                reason: "non-positive quote".into(),
            });
        }
        Ok(price)
    }
}
