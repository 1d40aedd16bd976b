use serde::Serialize;

use crate::liquidation::LiquidationResult;
use crate::models::RiskSnapshot;

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "risk_snapshot")]
    RiskSnapshot(RiskSnapshot),

    #[serde(rename = "liquidation")]
    Liquidation(LiquidationResult),
}
