use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{IdempotencyKey, NewReconciliationItem, ReconciliationItem},
    traits::ReconciliationError,
};

/// Queues an item for reconciliation. If the key is already queued, the existing item is returned unchanged.
pub async fn idempotent_insert(
    item: NewReconciliationItem,
    conn: &mut SqliteConnection,
) -> Result<ReconciliationItem, ReconciliationError> {
    let key = item.key.clone();
    let inserted: Result<Vec<ReconciliationItem>, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO reconciliation_items (gateway_txn_id, reference, reason, detail, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *;
        "#,
    )
    .bind(item.key.gateway_txn_id)
    .bind(item.key.reference)
    .bind(item.reason)
    .bind(item.detail)
    .bind(Utc::now())
    .fetch_all(&mut *conn)
    .await;
    match inserted {
        Ok(rows) => rows
            .into_iter()
            .next()
            .ok_or_else(|| ReconciliationError::DatabaseError(format!("Reconciliation insert for {key} returned no row"))),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => fetch_item_for_key(&key, conn)
            .await?
            .ok_or_else(|| ReconciliationError::DatabaseError(format!("Reconciliation item for {key} vanished"))),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_item_for_key(
    key: &IdempotencyKey,
    conn: &mut SqliteConnection,
) -> Result<Option<ReconciliationItem>, ReconciliationError> {
    let rows: Vec<ReconciliationItem> =
        sqlx::query_as("SELECT * FROM reconciliation_items WHERE gateway_txn_id = ? AND reference = ?")
            .bind(&key.gateway_txn_id)
            .bind(&key.reference)
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().next())
}

pub async fn fetch_item(id: i64, conn: &mut SqliteConnection) -> Result<Option<ReconciliationItem>, ReconciliationError> {
    let rows: Vec<ReconciliationItem> =
        sqlx::query_as("SELECT * FROM reconciliation_items WHERE id = ?").bind(id).fetch_all(conn).await?;
    Ok(rows.into_iter().next())
}

pub async fn fetch_open_items(conn: &mut SqliteConnection) -> Result<Vec<ReconciliationItem>, ReconciliationError> {
    let items = sqlx::query_as("SELECT * FROM reconciliation_items WHERE resolved_at IS NULL ORDER BY created_at, id")
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Marks an open item as resolved. Returns `None` if the item does not exist or was already resolved.
pub async fn mark_resolved(
    id: i64,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ReconciliationItem>, ReconciliationError> {
    let rows: Vec<ReconciliationItem> = sqlx::query_as(
        r#"
            UPDATE reconciliation_items SET resolved_at = ?, resolution_note = ?
            WHERE id = ? AND resolved_at IS NULL
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(note)
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().next())
}
