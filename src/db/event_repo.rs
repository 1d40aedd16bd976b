use sqlx::PgPool;

use crate::models::{ChainEvent, NewChainEvent};

/// Insert all events in one transaction. Returns the number of rows written.
pub async fn insert_events(pool: &PgPool, events: &[NewChainEvent]) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await?;
    let mut written = 0u64;

    for event in events {
        let result = sqlx::query(
            r#"
            INSERT INTO chain_events (block_number, tx_hash, log_index, event_name, contract_address, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.block_number)
        .bind(&event.tx_hash)
        .bind(event.log_index)
        .bind(&event.event_name)
        .bind(&event.contract_address)
        .bind(&event.data)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// Newest events first.
pub async fn list_events(pool: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<ChainEvent>> {
    let events = sqlx::query_as::<_, ChainEvent>(
        "SELECT * FROM chain_events ORDER BY id DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(events)
}
