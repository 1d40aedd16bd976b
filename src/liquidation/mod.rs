pub mod error;
pub mod lease;
pub mod pipeline;
pub mod settlement;

pub use error::{ErrorKind, LiquidationError};
pub use lease::{ExecutionLease, ExecutionLeases};
pub use pipeline::{
    LiquidationPipeline, LiquidationResult, PositionValuation, SimulationResult, MAX_SLIPPAGE_BPS,
};
pub use settlement::settlement_reference;
