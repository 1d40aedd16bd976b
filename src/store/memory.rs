use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::models::{ChainEvent, NewChainEvent, NewPosition, NewRiskSnapshot, Position, RiskSnapshot};

use super::{EventStore, PositionStore, SnapshotStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    positions: Vec<Position>,
    position_index: HashMap<String, usize>,
    snapshots: Vec<RiskSnapshot>,
    events: Vec<ChainEvent>,
}

/// In-memory store for tests and development. Ids are assigned
/// sequentially from 1, mirroring BIGSERIAL columns.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot_count(&self) -> usize {
        self.tables.read().snapshots.len()
    }
}

fn page<T: Clone>(rows: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    rows.skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl PositionStore for InMemoryStore {
    async fn find_by_position_id(&self, position_id: &str) -> StoreResult<Option<Position>> {
        let tables = self.tables.read();
        Ok(tables
            .position_index
            .get(position_id)
            .map(|&idx| tables.positions[idx].clone()))
    }

    async fn create(&self, position: NewPosition) -> StoreResult<Position> {
        let mut tables = self.tables.write();
        if tables.position_index.contains_key(&position.position_id) {
            return Err(StoreError::Conflict(format!(
                "position_id '{}' already exists",
                position.position_id
            )));
        }

        let now = Utc::now();
        let row = Position {
            id: tables.positions.len() as i64 + 1,
            position_id: position.position_id,
            owner_address: position.owner_address,
            collateral_symbol: position.collateral_symbol,
            collateral_amount: position.collateral_amount,
            debt_symbol: position.debt_symbol,
            debt_amount: position.debt_amount,
            created_at: now,
            updated_at: now,
        };
        let idx = tables.positions.len();
        tables.position_index.insert(row.position_id.clone(), idx);
        tables.positions.push(row.clone());
        Ok(row)
    }

    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<Position>> {
        let tables = self.tables.read();
        Ok(page(tables.positions.iter().cloned(), limit, offset))
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.tables.read().positions.len() as i64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn insert(&self, snapshot: NewRiskSnapshot) -> StoreResult<RiskSnapshot> {
        let mut tables = self.tables.write();
        let row = RiskSnapshot {
            id: tables.snapshots.len() as i64 + 1,
            position_id: snapshot.position_id,
            health_factor: snapshot.health_factor,
            eligible: snapshot.eligible,
            created_at: Utc::now(),
        };
        tables.snapshots.push(row.clone());
        Ok(row)
    }

    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<RiskSnapshot>> {
        let tables = self.tables.read();
        Ok(page(tables.snapshots.iter().rev().cloned(), limit, offset))
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn insert_batch(&self, events: Vec<NewChainEvent>) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let written = events.len() as u64;
        for event in events {
            let id = tables.events.len() as i64 + 1;
            tables.events.push(ChainEvent {
                id,
                block_number: event.block_number,
                tx_hash: event.tx_hash,
                log_index: event.log_index,
                event_name: event.event_name,
                contract_address: event.contract_address,
                data: event.data,
                created_at: now,
            });
        }
        Ok(written)
    }

    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<ChainEvent>> {
        let tables = self.tables.read();
        Ok(page(tables.events.iter().rev().cloned(), limit, offset))
    }
}
