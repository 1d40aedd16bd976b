pub mod evaluator;

pub use evaluator::{
    compute_health, RiskLevel, RiskMetrics, DEFAULT_LIQUIDATION_THRESHOLD, NO_DEBT_HEALTH_FACTOR,
};
