use std::sync::Arc;

use metrics::counter;

use crate::liquidation::{LiquidationError, LiquidationPipeline};
use crate::models::{NewRiskSnapshot, RiskSnapshot};
use crate::store::SnapshotStore;

/// Largest page `list_snapshots` will return.
pub const MAX_SNAPSHOT_PAGE: i64 = 200;

/// Persists point-in-time risk evaluations.
///
/// Evaluation goes through the pipeline's shared routine, so a snapshot
/// always agrees with what `simulate` would have reported at that moment.
pub struct RiskSnapshotRecorder {
    pipeline: Arc<LiquidationPipeline>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl RiskSnapshotRecorder {
    pub fn new(pipeline: Arc<LiquidationPipeline>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { pipeline, snapshots }
    }

    /// Evaluate a position and append one snapshot row. Nothing is written
    /// when evaluation fails.
    pub async fn snapshot_position(&self, position_id: &str) -> Result<RiskSnapshot, LiquidationError> {
        let valuation = self.pipeline.evaluate(position_id).await?;

        let snapshot = self
            .snapshots
            .insert(NewRiskSnapshot {
                position_id: valuation.position.position_id,
                health_factor: valuation.metrics.health_factor,
                eligible: valuation.metrics.eligible,
            })
            .await?;

        counter!("risk_snapshots_total").increment(1);
        tracing::info!(
            snapshot_id = snapshot.id,
            position_id = %snapshot.position_id,
            health_factor = snapshot.health_factor,
            eligible = snapshot.eligible,
            "Risk snapshot recorded"
        );
        Ok(snapshot)
    }

    /// Newest-first page of snapshots across all positions.
    pub async fn list_snapshots(&self, limit: i64, offset: i64) -> Result<Vec<RiskSnapshot>, LiquidationError> {
        if !(1..=MAX_SNAPSHOT_PAGE).contains(&limit) {
            return Err(LiquidationError::InvalidInput(format!(
                "limit must be between 1 and {MAX_SNAPSHOT_PAGE}"
            )));
        }
        if offset < 0 {
            return Err(LiquidationError::InvalidInput("offset must be >= 0".into()));
        }
        Ok(self.snapshots.list(limit, offset).await?)
    }
}
