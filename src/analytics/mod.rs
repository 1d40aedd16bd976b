pub mod portfolio;
pub mod recorder;

pub use portfolio::{
    assess_positions, CriticalPosition, HealthDistribution, PortfolioReport, SystemStatus,
    MAX_CRITICAL_POSITIONS,
};
pub use recorder::{RiskSnapshotRecorder, MAX_SNAPSHOT_PAGE};
