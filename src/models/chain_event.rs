use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for chain_events table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChainEvent {
    pub id: i64,
    pub block_number: i64,
    pub tx_hash: String,
    pub log_index: i32,
    pub event_name: String,
    pub contract_address: String,
    pub data: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChainEvent {
    pub block_number: i64,
    pub tx_hash: String,
    pub log_index: i32,
    pub event_name: String,
    pub contract_address: String,
    pub data: String,
}
