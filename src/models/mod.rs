pub mod chain_event;
pub mod position;
pub mod snapshot;

pub use chain_event::{ChainEvent, NewChainEvent};
pub use position::{CreatePositionRequest, NewPosition, Position, PositionValidationError};
pub use snapshot::{NewRiskSnapshot, RiskSnapshot};
