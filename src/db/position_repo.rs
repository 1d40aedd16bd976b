use sqlx::PgPool;

use crate::models::{NewPosition, Position};

/// Insert a new position. A duplicate `position_id` fails with a
/// unique-violation database error.
pub async fn insert_position(pool: &PgPool, position: &NewPosition) -> anyhow::Result<Position> {
    let pos = sqlx::query_as::<_, Position>(
        r#"
        INSERT INTO positions
            (position_id, owner_address, collateral_symbol, collateral_amount, debt_symbol, debt_amount)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&position.position_id)
    .bind(&position.owner_address)
    .bind(&position.collateral_symbol)
    .bind(&position.collateral_amount)
    .bind(&position.debt_symbol)
    .bind(&position.debt_amount)
    .fetch_one(pool)
    .await?;

    Ok(pos)
}

pub async fn get_position_by_position_id(
    pool: &PgPool,
    position_id: &str,
) -> anyhow::Result<Option<Position>> {
    let pos = sqlx::query_as::<_, Position>("SELECT * FROM positions WHERE position_id = $1")
        .bind(position_id)
        .fetch_optional(pool)
        .await?;

    Ok(pos)
}

/// Page through positions in insertion order.
pub async fn list_positions(pool: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Position>> {
    let positions = sqlx::query_as::<_, Position>(
        "SELECT * FROM positions ORDER BY id LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(positions)
}

pub async fn count_positions(pool: &PgPool) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM positions")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}
