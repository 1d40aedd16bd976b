//! Storage traits consumed by the pipeline, recorder and indexer.
//!
//! `PgStore` backs the service in production; `InMemoryStore` backs tests
//! and local experiments without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ChainEvent, NewChainEvent, NewPosition, NewRiskSnapshot, Position, RiskSnapshot};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same unique key already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Sole owner of position records.
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn find_by_position_id(&self, position_id: &str) -> StoreResult<Option<Position>>;

    /// Create a position. Fails with [`StoreError::Conflict`] when the
    /// `position_id` is already taken; nothing is written in that case.
    async fn create(&self, position: NewPosition) -> StoreResult<Position>;

    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<Position>>;

    async fn count(&self) -> StoreResult<i64>;

    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

/// Append-only storage for risk snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn insert(&self, snapshot: NewRiskSnapshot) -> StoreResult<RiskSnapshot>;

    /// Snapshots ordered newest first.
    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<RiskSnapshot>>;
}

/// Storage for indexed chain events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert all events atomically, returning how many were written.
    async fn insert_batch(&self, events: Vec<NewChainEvent>) -> StoreResult<u64>;

    /// Events ordered newest first.
    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<ChainEvent>>;
}
