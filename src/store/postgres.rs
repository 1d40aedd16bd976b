use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{self, event_repo, position_repo, snapshot_repo};
use crate::models::{ChainEvent, NewChainEvent, NewPosition, NewRiskSnapshot, Position, RiskSnapshot};

use super::{EventStore, PositionStore, SnapshotStore, StoreError, StoreResult};

/// Postgres-backed store delegating to the `db` repositories.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionStore for PgStore {
    async fn find_by_position_id(&self, position_id: &str) -> StoreResult<Option<Position>> {
        Ok(position_repo::get_position_by_position_id(&self.pool, position_id).await?)
    }

    async fn create(&self, position: NewPosition) -> StoreResult<Position> {
        match position_repo::insert_position(&self.pool, &position).await {
            Ok(pos) => Ok(pos),
            Err(e) if db::is_unique_violation(&e) => Err(StoreError::Conflict(format!(
                "position_id '{}' already exists",
                position.position_id
            ))),
            Err(e) => Err(StoreError::Backend(e)),
        }
    }

    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<Position>> {
        Ok(position_repo::list_positions(&self.pool, limit, offset).await?)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(position_repo::count_positions(&self.pool).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PgStore {
    async fn insert(&self, snapshot: NewRiskSnapshot) -> StoreResult<RiskSnapshot> {
        Ok(snapshot_repo::insert_snapshot(&self.pool, &snapshot).await?)
    }

    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<RiskSnapshot>> {
        Ok(snapshot_repo::list_snapshots(&self.pool, limit, offset).await?)
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn insert_batch(&self, events: Vec<NewChainEvent>) -> StoreResult<u64> {
        Ok(event_repo::insert_events(&self.pool, &events).await?)
    }

    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<ChainEvent>> {
        Ok(event_repo::list_events(&self.pool, limit, offset).await?)
    }
}
