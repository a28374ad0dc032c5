use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{InventorySlot, NewSale, SaleRecord, SlotId},
    traits::InventoryError,
};

/// Takes one unit from the slot, if there is one to take. Returns the new stock level, or `None` if the slot is empty
/// or does not exist. The stock predicate lives in the `UPDATE`, so there is no window between the check and the
/// decrement.
pub async fn try_decrement_stock(slot: &SlotId, conn: &mut SqliteConnection) -> Result<Option<i64>, InventoryError> {
    let stock: Vec<(i64,)> = sqlx::query_as(
        r#"
            UPDATE inventory_slots SET current_stock = current_stock - 1, updated_at = ?
            WHERE id = ? AND current_stock > 0
            RETURNING current_stock;
        "#,
    )
    .bind(Utc::now())
    .bind(slot)
    .fetch_all(conn)
    .await?;
    Ok(stock.into_iter().next().map(|s| s.0))
}

/// Inserts a sale record. This is not atomic on its own. Call it inside the same transaction as
/// [`try_decrement_stock`], passing `&mut *tx` as the connection argument.
pub async fn insert_sale(
    slot: &SlotId,
    sale: NewSale,
    conn: &mut SqliteConnection,
) -> Result<SaleRecord, InventoryError> {
    let rows: Vec<SaleRecord> = sqlx::query_as(
        r#"
            INSERT INTO sales (reference, gateway_txn_id, slot_id, amount, currency, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *;
        "#,
    )
    .bind(sale.reference)
    .bind(sale.gateway_txn_id)
    .bind(slot)
    .bind(sale.amount)
    .bind(sale.currency)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?;
    rows.into_iter().next().ok_or_else(|| InventoryError::DatabaseError("Sale insert returned no row".into()))
}

pub async fn fetch_slot(slot: &SlotId, conn: &mut SqliteConnection) -> Result<Option<InventorySlot>, InventoryError> {
    let rows: Vec<InventorySlot> =
        sqlx::query_as("SELECT * FROM inventory_slots WHERE id = ?").bind(slot).fetch_all(conn).await?;
    Ok(rows.into_iter().next())
}

pub async fn upsert_slot(
    slot: &SlotId,
    stock: i64,
    capacity: i64,
    conn: &mut SqliteConnection,
) -> Result<InventorySlot, InventoryError> {
    let rows: Vec<InventorySlot> = sqlx::query_as(
        r#"
            INSERT INTO inventory_slots (id, current_stock, capacity, updated_at) VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                current_stock = excluded.current_stock,
                capacity = excluded.capacity,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(slot)
    .bind(stock)
    .bind(capacity)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?;
    rows.into_iter().next().ok_or_else(|| InventoryError::DatabaseError(format!("Upsert of slot {slot} returned no row")))
}

pub async fn fetch_sales_for_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<SaleRecord>, InventoryError> {
    let sales = sqlx::query_as("SELECT * FROM sales WHERE reference = ? ORDER BY id")
        .bind(reference)
        .fetch_all(conn)
        .await?;
    Ok(sales)
}

pub async fn fetch_sales_for_slot(slot: &SlotId, conn: &mut SqliteConnection) -> Result<Vec<SaleRecord>, InventoryError> {
    let sales = sqlx::query_as("SELECT * FROM sales WHERE slot_id = ? ORDER BY id").bind(slot).fetch_all(conn).await?;
    Ok(sales)
}
