use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{IdempotencyKey, IdempotencyRecord, LedgerOutcome},
    traits::{ClaimResult, LedgerError},
};

/// Claims the key with a single `INSERT`. The primary key on `(gateway_txn_id, reference)` is what makes this atomic:
/// a concurrent insert of the same key fails with a unique violation, which is reported as `AlreadyClaimed`.
pub async fn claim(key: &IdempotencyKey, conn: &mut SqliteConnection) -> Result<ClaimResult, LedgerError> {
    let now = Utc::now();
    let inserted: Result<Vec<IdempotencyRecord>, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO idempotency_ledger (gateway_txn_id, reference, first_seen_at, last_seen_at, deliveries)
            VALUES (?, ?, ?, ?, 1)
            RETURNING *;
        "#,
    )
    .bind(&key.gateway_txn_id)
    .bind(&key.reference)
    .bind(now)
    .bind(now)
    .fetch_all(&mut *conn)
    .await;
    match inserted {
        Ok(rows) => rows.into_iter().next().map(ClaimResult::Claimed).ok_or_else(|| missing_row(key)),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            trace!("🗃️ Ledger key {key} already exists. Recording redelivery.");
            let record = record_redelivery(key, conn).await?;
            Ok(ClaimResult::AlreadyClaimed(record))
        },
        Err(e) => Err(e.into()),
    }
}

async fn record_redelivery(
    key: &IdempotencyKey,
    conn: &mut SqliteConnection,
) -> Result<IdempotencyRecord, LedgerError> {
    let rows: Vec<IdempotencyRecord> = sqlx::query_as(
        r#"
            UPDATE idempotency_ledger SET deliveries = deliveries + 1, last_seen_at = ?
            WHERE gateway_txn_id = ? AND reference = ?
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(&key.gateway_txn_id)
    .bind(&key.reference)
    .fetch_all(conn)
    .await?;
    rows.into_iter().next().ok_or_else(|| missing_row(key))
}

fn missing_row(key: &IdempotencyKey) -> LedgerError {
    LedgerError::DatabaseError(format!("Ledger write for {key} returned no row"))
}

/// Writes the outcome for a claimed key, but only if no outcome has been written yet.
pub async fn settle(
    key: &IdempotencyKey,
    outcome: LedgerOutcome,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    if outcome == LedgerOutcome::Duplicate {
        return Err(LedgerError::InvalidOutcome(outcome));
    }
    let result = sqlx::query(
        r#"
            UPDATE idempotency_ledger SET outcome = ?
            WHERE gateway_txn_id = ? AND reference = ? AND outcome IS NULL;
        "#,
    )
    .bind(outcome)
    .bind(&key.gateway_txn_id)
    .bind(&key.reference)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 1 {
        return Ok(());
    }
    match fetch_record(key, conn).await? {
        Some(_) => Err(LedgerError::AlreadySettled(key.clone())),
        None => Err(LedgerError::NotClaimed(key.clone())),
    }
}

/// Replaces the outcome for a key regardless of its current value. Only reconciliation may call this.
pub async fn overwrite_outcome(
    key: &IdempotencyKey,
    outcome: LedgerOutcome,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE idempotency_ledger SET outcome = ? WHERE gateway_txn_id = ? AND reference = ?")
        .bind(outcome)
        .bind(&key.gateway_txn_id)
        .bind(&key.reference)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::NotClaimed(key.clone()));
    }
    Ok(())
}

pub async fn fetch_record(
    key: &IdempotencyKey,
    conn: &mut SqliteConnection,
) -> Result<Option<IdempotencyRecord>, LedgerError> {
    let rows: Vec<IdempotencyRecord> =
        sqlx::query_as("SELECT * FROM idempotency_ledger WHERE gateway_txn_id = ? AND reference = ?")
            .bind(&key.gateway_txn_id)
            .bind(&key.reference)
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().next())
}
