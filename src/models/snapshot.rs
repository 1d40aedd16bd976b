use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for risk_snapshots table. Rows are never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RiskSnapshot {
    pub id: i64,
    pub position_id: String,
    pub health_factor: f64,
    pub eligible: bool,
    pub created_at: DateTime<Utc>,
}

/// Snapshot values computed by the pipeline, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRiskSnapshot {
    pub position_id: String,
    pub health_factor: f64,
    pub eligible: bool,
}
