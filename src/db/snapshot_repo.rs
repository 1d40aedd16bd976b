use sqlx::PgPool;

use crate::models::{NewRiskSnapshot, RiskSnapshot};

pub async fn insert_snapshot(pool: &PgPool, snapshot: &NewRiskSnapshot) -> anyhow::Result<RiskSnapshot> {
    let snap = sqlx::query_as::<_, RiskSnapshot>(
        r#"
        INSERT INTO risk_snapshots (position_id, health_factor, eligible)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&snapshot.position_id)
    .bind(snapshot.health_factor)
    .bind(snapshot.eligible)
    .fetch_one(pool)
    .await?;

    Ok(snap)
}

/// Newest snapshots first.
pub async fn list_snapshots(pool: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<RiskSnapshot>> {
    let snaps = sqlx::query_as::<_, RiskSnapshot>(
        "SELECT * FROM risk_snapshots ORDER BY id DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(snaps)
}
