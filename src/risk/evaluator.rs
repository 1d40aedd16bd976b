use serde::{Deserialize, Serialize};

/// Fraction of collateral value counted toward solvency.
pub const DEFAULT_LIQUIDATION_THRESHOLD: f64 = 0.85;

/// Health factor reported for positions without debt.
pub const NO_DEBT_HEALTH_FACTOR: f64 = 10.0;

/// Health factor at or above which a position is considered safe.
const SAFE_HEALTH_FACTOR: f64 = 2.0;

/// Output of a single risk evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub health_factor: f64,
    pub eligible: bool,
}

/// Compute the health factor of a position from its USD-denominated legs.
///
/// `health_factor = collateral_usd * liquidation_threshold / debt_usd`, and the
/// position is eligible for liquidation when it drops below 1.0. Positions
/// with no debt report [`NO_DEBT_HEALTH_FACTOR`] and are never eligible.
pub fn compute_health(collateral_usd: f64, debt_usd: f64, liquidation_threshold: f64) -> RiskMetrics {
    if debt_usd <= 0.0 {
        return RiskMetrics {
            health_factor: NO_DEBT_HEALTH_FACTOR,
            eligible: false,
        };
    }

    let health_factor = (collateral_usd * liquidation_threshold) / debt_usd;
    RiskMetrics {
        health_factor,
        eligible: health_factor < 1.0,
    }
}

/// Presentation bucket for a health factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Warning,
    Critical,
}

impl RiskLevel {
    pub fn from_health_factor(health_factor: f64) -> Self {
        if health_factor >= SAFE_HEALTH_FACTOR {
            RiskLevel::Safe
        } else if health_factor >= 1.0 {
            RiskLevel::Warning
        } else {
            RiskLevel::Critical
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
