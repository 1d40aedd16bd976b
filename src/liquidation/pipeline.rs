use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::models::Position;
use crate::pricing::{PriceError, PriceResolver};
use crate::risk::{compute_health, RiskMetrics, DEFAULT_LIQUIDATION_THRESHOLD};
use crate::store::PositionStore;

use super::error::LiquidationError;
use super::lease::{ExecutionLease, ExecutionLeases};
use super::settlement::settlement_reference;

/// Upper bound for `max_slippage_bps` (100%).
pub const MAX_SLIPPAGE_BPS: i64 = 10_000;

const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(5);

type Result<T> = std::result::Result<T, LiquidationError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub position_id: String,
    pub health_factor: f64,
    pub eligible: bool,
    pub estimated_profit_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationResult {
    pub position_id: String,
    /// Settlement reference; empty when nothing was executed.
    pub tx_hash: String,
    pub realized_profit_usd: f64,
}

impl LiquidationResult {
    pub fn executed(&self) -> bool {
        !self.tx_hash.is_empty()
    }
}

/// A position valued in USD at current prices.
#[derive(Debug, Clone)]
pub struct PositionValuation {
    pub position: Position,
    pub collateral_usd: Decimal,
    pub debt_usd: Decimal,
    pub metrics: RiskMetrics,
}

impl PositionValuation {
    /// Liquidation bonus net of debt repayment; zero unless eligible.
    pub fn estimated_profit_usd(&self) -> Decimal {
        if self.metrics.eligible {
            (self.collateral_usd - self.debt_usd).max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }
}

/// Loads positions, prices both legs, evaluates risk and settles
/// liquidations. Holds no per-call state; every call runs
/// load → price → convert → evaluate strictly in order.
pub struct LiquidationPipeline {
    positions: Arc<dyn PositionStore>,
    prices: Arc<dyn PriceResolver>,
    liquidation_threshold: f64,
    collaborator_timeout: Duration,
    leases: Option<Arc<ExecutionLeases>>,
}

impl LiquidationPipeline {
    pub fn new(positions: Arc<dyn PositionStore>, prices: Arc<dyn PriceResolver>) -> Self {
        Self {
            positions,
            prices,
            liquidation_threshold: DEFAULT_LIQUIDATION_THRESHOLD,
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
            leases: Some(ExecutionLeases::new()),
        }
    }

    pub fn with_liquidation_threshold(mut self, threshold: f64) -> Self {
        self.liquidation_threshold = threshold;
        self
    }

    /// Deadline applied to every store lookup and price resolution.
    pub fn with_collaborator_timeout(mut self, deadline: Duration) -> Self {
        self.collaborator_timeout = deadline;
        self
    }

    /// Allow concurrent executions against the same position.
    pub fn without_execution_lease(mut self) -> Self {
        self.leases = None;
        self
    }

    // -----------------------------------------------------------------------
    // Evaluation (shared by simulate, execute and the snapshot recorder)
    // -----------------------------------------------------------------------

    /// Load a position by its external identifier and value it.
    pub async fn evaluate(&self, position_id: &str) -> Result<PositionValuation> {
        let position = self.load_position(position_id).await?;
        self.evaluate_position(position).await
    }

    /// Value an already-loaded position.
    pub async fn evaluate_position(&self, position: Position) -> Result<PositionValuation> {
        let collateral_price = self.resolve_price(&position.collateral_symbol).await?;
        let debt_price = self.resolve_price(&position.debt_symbol).await?;

        let collateral_usd = usd_value("collateral_amount", &position.collateral_amount, collateral_price)?;
        let debt_usd = usd_value("debt_amount", &position.debt_amount, debt_price)?;
        if collateral_usd < Decimal::ZERO || debt_usd < Decimal::ZERO {
            return Err(LiquidationError::InvalidInput("amounts cannot be negative".into()));
        }

        let metrics = compute_health(
            to_f64("collateral_usd", collateral_usd)?,
            to_f64("debt_usd", debt_usd)?,
            self.liquidation_threshold,
        );

        tracing::debug!(
            position_id = %position.position_id,
            collateral_usd = %collateral_usd,
            debt_usd = %debt_usd,
            health_factor = metrics.health_factor,
            eligible = metrics.eligible,
            "Position evaluated"
        );

        Ok(PositionValuation {
            position,
            collateral_usd,
            debt_usd,
            metrics,
        })
    }

    async fn load_position(&self, position_id: &str) -> Result<Position> {
        let id = position_id.trim();
        if id.is_empty() {
            return Err(LiquidationError::InvalidInput("position_id cannot be empty".into()));
        }

        let found = timeout(self.collaborator_timeout, self.positions.find_by_position_id(id))
            .await
            .map_err(|_| {
                LiquidationError::Storage(anyhow::anyhow!("position lookup for '{id}' timed out"))
            })??;

        found.ok_or_else(|| LiquidationError::PositionNotFound(id.to_string()))
    }

    async fn resolve_price(&self, symbol: &str) -> Result<Decimal> {
        let quote = match timeout(self.collaborator_timeout, self.prices.get_price_usd(symbol)).await {
            Ok(quote) => quote,
            Err(_) => Err(PriceError::Timeout(symbol.to_string())),
        };

        quote.map_err(|source| {
            counter!("price_lookup_failures_total").increment(1);
            tracing::warn!(symbol, error = %source, "Price lookup failed");
            LiquidationError::PriceUnavailable {
                symbol: symbol.to_string(),
                source,
            }
        })
    }

    // -----------------------------------------------------------------------
    // Simulate
    // -----------------------------------------------------------------------

    pub async fn simulate(&self, position_id: &str) -> Result<SimulationResult> {
        let started = Instant::now();
        counter!("liquidation_simulations_total").increment(1);

        let result = self.run_simulation(position_id).await;

        histogram!("pipeline_latency_seconds", "operation" => "simulate")
            .record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            counter!("liquidation_failures_total", "kind" => e.kind().as_str()).increment(1);
        }
        result
    }

    async fn run_simulation(&self, position_id: &str) -> Result<SimulationResult> {
        let valuation = self.evaluate(position_id).await?;
        let estimated_profit_usd = to_f64("estimated_profit_usd", valuation.estimated_profit_usd())?;

        Ok(SimulationResult {
            position_id: valuation.position.position_id,
            health_factor: valuation.metrics.health_factor,
            eligible: valuation.metrics.eligible,
            estimated_profit_usd,
        })
    }

    // -----------------------------------------------------------------------
    // Execute
    // -----------------------------------------------------------------------

    /// Liquidate a position if it is eligible.
    ///
    /// A non-eligible position is a successful no-op with an empty
    /// `tx_hash`. `max_slippage_bps` is range-checked before any lookup but
    /// not enforced: no real execution price exists to slip against.
    pub async fn execute(&self, position_id: &str, max_slippage_bps: i64) -> Result<LiquidationResult> {
        let started = Instant::now();

        let result = self.run_execution(position_id, max_slippage_bps).await;

        histogram!("pipeline_latency_seconds", "operation" => "execute")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(r) => {
                let outcome = if r.executed() { "executed" } else { "skipped" };
                counter!("liquidation_executions_total", "outcome" => outcome).increment(1);
            }
            Err(e) => {
                counter!("liquidation_failures_total", "kind" => e.kind().as_str()).increment(1);
            }
        }
        result
    }

    async fn run_execution(&self, position_id: &str, max_slippage_bps: i64) -> Result<LiquidationResult> {
        validate_slippage(max_slippage_bps)?;

        let _lease = self.acquire_lease(position_id)?;

        let sim = self
            .run_simulation(position_id)
            .await
            .map_err(|e| LiquidationError::Simulation(Box::new(e)))?;

        if !sim.eligible {
            tracing::info!(
                position_id = %sim.position_id,
                health_factor = sim.health_factor,
                "Position not eligible for liquidation, nothing executed"
            );
            return Ok(LiquidationResult {
                position_id: sim.position_id,
                tx_hash: String::new(),
                realized_profit_usd: 0.0,
            });
        }

        let tx_hash = settlement_reference(&sim.position_id).map_err(|e| {
            LiquidationError::ExecutionFailed(format!("could not derive settlement reference: {e}"))
        })?;

        tracing::info!(
            position_id = %sim.position_id,
            tx_hash = %tx_hash,
            health_factor = sim.health_factor,
            realized_profit_usd = sim.estimated_profit_usd,
            max_slippage_bps,
            "Liquidation settled"
        );

        Ok(LiquidationResult {
            position_id: sim.position_id,
            tx_hash,
            realized_profit_usd: sim.estimated_profit_usd,
        })
    }

    fn acquire_lease(&self, position_id: &str) -> Result<Option<ExecutionLease>> {
        let id = position_id.trim();
        let Some(leases) = &self.leases else {
            return Ok(None);
        };
        // Blank ids are rejected by the simulation step.
        if id.is_empty() {
            return Ok(None);
        }
        leases
            .try_acquire(id)
            .map(Some)
            .ok_or_else(|| LiquidationError::ExecutionInProgress(id.to_string()))
    }
}

fn validate_slippage(max_slippage_bps: i64) -> Result<()> {
    if !(0..=MAX_SLIPPAGE_BPS).contains(&max_slippage_bps) {
        return Err(LiquidationError::InvalidInput(format!(
            "max_slippage_bps must be an integer between 0 and {MAX_SLIPPAGE_BPS}, got {max_slippage_bps}"
        )));
    }
    Ok(())
}

/// Parse an exact-text amount and convert it to USD.
fn usd_value(field: &'static str, amount: &str, price_usd: Decimal) -> Result<Decimal> {
    let parsed = Decimal::from_str(amount.trim()).map_err(|e| LiquidationError::InvalidAmount {
        field,
        value: amount.to_string(),
        reason: e.to_string(),
    })?;

    parsed
        .checked_mul(price_usd)
        .ok_or_else(|| LiquidationError::InvalidAmount {
            field,
            value: amount.to_string(),
            reason: "USD value overflows".into(),
        })
}

fn to_f64(field: &'static str, value: Decimal) -> Result<f64> {
    value.to_f64().ok_or_else(|| LiquidationError::InvalidAmount {
        field,
        value: value.to_string(),
        reason: "not representable as a float".into(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
