use sqlx::PgPool;
use uuid::Uuid;

use crate::movements::balance::Balance;
use crate::movements::repo_types::{format_rfc3339, BalanceRow, MovementRow};

/// Listing cap: the UI only renders the most recent page of movements.
pub const MOVEMENT_PAGE_LIMIT: i64 = 100;

pub async fn insert_movement(db: &PgPool, row: &MovementRow) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO movements
            (id, owner_id, kind, name, created_at, value, total_amount, monthly_payment, term_months)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(row.id)
    .bind(row.owner_id)
    .bind(&row.kind)
    .bind(&row.name)
    .bind(&row.created_at)
    .bind(&row.value)
    .bind(&row.total_amount)
    .bind(&row.monthly_payment)
    .bind(&row.term_months)
    .execute(db)
    .await?;
    Ok(())
}

/// Most recent movements for one owner, newest first.
pub async fn list_recent_by_owner(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<MovementRow>> {
    let rows = sqlx::query_as::<_, MovementRow>(
        r#"
        SELECT id, owner_id, kind, name, created_at, value, total_amount, monthly_payment, term_months
        FROM movements
        WHERE owner_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(owner_id)
    .bind(MOVEMENT_PAGE_LIMIT)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get_balance(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Option<BalanceRow>> {
    let row = sqlx::query_as::<_, BalanceRow>(
        r#"
        SELECT owner_id, total, last_updated, available, pending_debt, real_balance
        FROM balances
        WHERE owner_id = $1
        "#,
    )
    .bind(owner_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Writes the balance for its owner, inserting or overwriting the single row.
/// Concurrent writers are last-write-wins; there is no per-user locking.
pub async fn upsert_balance(db: &PgPool, balance: &Balance) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO balances (owner_id, total, last_updated, available, pending_debt, real_balance)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (owner_id) DO UPDATE SET
            total = EXCLUDED.total,
            last_updated = EXCLUDED.last_updated,
            available = EXCLUDED.available,
            pending_debt = EXCLUDED.pending_debt,
            real_balance = EXCLUDED.real_balance
        "#,
    )
    .bind(balance.owner_id)
    .bind(balance.total)
    .bind(format_rfc3339(balance.last_updated))
    .bind(balance.available)
    .bind(balance.pending_debt)
    .bind(balance.real_balance)
    .execute(db)
    .await?;
    Ok(())
}

/// Removes a user's balance row. Used by the registration saga rollback.
pub async fn delete_balance(db: &PgPool, owner_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM balances WHERE owner_id = $1")
        .bind(owner_id)
        .execute(db)
        .await?;
    Ok(())
}
