//! In-memory backend for the callback processor.
//!
//! All state lives behind a single [`std::sync::Mutex`]. Every trait method takes the lock, does its work
//! synchronously and releases it before returning, so the lock is never held across an await point. This makes each
//! method trivially atomic, which is all the ledger and fulfilment contracts ask for.
//!
//! Nothing is persisted. Use it for single-instance kiosks that tolerate losing the ledger on restart, and in tests.
use std::{
    collections::{hash_map::Entry, BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use log::*;

use crate::{
    db_types::{
        IdempotencyKey,
        IdempotencyRecord,
        InventorySlot,
        LedgerOutcome,
        NewReconciliationItem,
        NewSale,
        ReconciliationItem,
        SaleRecord,
        SlotId,
    },
    traits::{
        ClaimResult,
        FulfillmentResult,
        IdempotencyLedger,
        InventoryError,
        InventoryManagement,
        LedgerError,
        ReconciliationError,
        ReconciliationManagement,
        validate_stock,
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    ledger: HashMap<IdempotencyKey, IdempotencyRecord>,
    slots: HashMap<SlotId, InventorySlot>,
    sales: Vec<SaleRecord>,
    reconciliation: BTreeMap<i64, ReconciliationItem>,
    next_reconciliation_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, String> {
        self.state.lock().map_err(|e| format!("In-memory store lock is poisoned: {e}"))
    }
}

impl IdempotencyLedger for MemoryDatabase {
    async fn claim(&self, key: &IdempotencyKey) -> Result<ClaimResult, LedgerError> {
        let mut state = self.lock().map_err(LedgerError::DatabaseError)?;
        let now = Utc::now();
        let result = match state.ledger.entry(key.clone()) {
            Entry::Vacant(entry) => {
                let record = IdempotencyRecord {
                    gateway_txn_id: key.gateway_txn_id.clone(),
                    reference: key.reference.clone(),
                    first_seen_at: now,
                    last_seen_at: now,
                    deliveries: 1,
                    outcome: None,
                };
                ClaimResult::Claimed(entry.insert(record).clone())
            },
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.deliveries += 1;
                record.last_seen_at = now;
                ClaimResult::AlreadyClaimed(record.clone())
            },
        };
        trace!("🗃️ Ledger key {key} claim result: claimed = {}", result.is_claimed());
        Ok(result)
    }

    async fn settle(&self, key: &IdempotencyKey, outcome: LedgerOutcome) -> Result<(), LedgerError> {
        if outcome == LedgerOutcome::Duplicate {
            return Err(LedgerError::InvalidOutcome(outcome));
        }
        let mut state = self.lock().map_err(LedgerError::DatabaseError)?;
        let record = state.ledger.get_mut(key).ok_or_else(|| LedgerError::NotClaimed(key.clone()))?;
        if record.outcome.is_some() {
            return Err(LedgerError::AlreadySettled(key.clone()));
        }
        record.outcome = Some(outcome);
        Ok(())
    }

    async fn fetch_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>, LedgerError> {
        let state = self.lock().map_err(LedgerError::DatabaseError)?;
        Ok(state.ledger.get(key).cloned())
    }
}

impl InventoryManagement for MemoryDatabase {
    async fn fulfill(&self, slot: &SlotId, sale: NewSale) -> Result<FulfillmentResult, InventoryError> {
        let mut state = self.lock().map_err(InventoryError::DatabaseError)?;
        let now = Utc::now();
        let Some(entry) = state.slots.get_mut(slot) else {
            return Ok(FulfillmentResult::UnknownTarget);
        };
        if entry.current_stock <= 0 {
            return Ok(FulfillmentResult::InsufficientStock);
        }
        entry.current_stock -= 1;
        entry.updated_at = now;
        let record = SaleRecord {
            id: state.sales.len() as i64 + 1,
            reference: sale.reference,
            gateway_txn_id: sale.gateway_txn_id,
            slot_id: slot.clone(),
            amount: sale.amount,
            currency: sale.currency,
            created_at: now,
        };
        state.sales.push(record.clone());
        debug!("🗃️ Sale #{} for {} recorded against slot {slot}", record.id, record.reference);
        Ok(FulfillmentResult::Fulfilled(record))
    }

    async fn fetch_slot(&self, slot: &SlotId) -> Result<Option<InventorySlot>, InventoryError> {
        let state = self.lock().map_err(InventoryError::DatabaseError)?;
        Ok(state.slots.get(slot).cloned())
    }

    async fn upsert_slot(&self, slot: &SlotId, stock: i64, capacity: i64) -> Result<InventorySlot, InventoryError> {
        validate_stock(stock, capacity)?;
        let mut state = self.lock().map_err(InventoryError::DatabaseError)?;
        let updated = InventorySlot { id: slot.clone(), current_stock: stock, capacity, updated_at: Utc::now() };
        state.slots.insert(slot.clone(), updated.clone());
        info!("🗃️ Slot {slot} set to {stock}/{capacity}");
        Ok(updated)
    }

    async fn fetch_sales_for_reference(&self, reference: &str) -> Result<Vec<SaleRecord>, InventoryError> {
        let state = self.lock().map_err(InventoryError::DatabaseError)?;
        Ok(state.sales.iter().filter(|s| s.reference == reference).cloned().collect())
    }

    async fn fetch_sales_for_slot(&self, slot: &SlotId) -> Result<Vec<SaleRecord>, InventoryError> {
        let state = self.lock().map_err(InventoryError::DatabaseError)?;
        Ok(state.sales.iter().filter(|s| &s.slot_id == slot).cloned().collect())
    }
}

impl ReconciliationManagement for MemoryDatabase {
    async fn flag_for_reconciliation(
        &self,
        item: NewReconciliationItem,
    ) -> Result<ReconciliationItem, ReconciliationError> {
        let mut state = self.lock().map_err(ReconciliationError::DatabaseError)?;
        if let Some(existing) = state.reconciliation.values().find(|r| r.key() == item.key) {
            return Ok(existing.clone());
        }
        state.next_reconciliation_id += 1;
        let id = state.next_reconciliation_id;
        let new_item = ReconciliationItem {
            id,
            gateway_txn_id: item.key.gateway_txn_id,
            reference: item.key.reference,
            reason: item.reason,
            detail: item.detail,
            created_at: Utc::now(),
            resolved_at: None,
            resolution_note: None,
        };
        state.reconciliation.insert(id, new_item.clone());
        Ok(new_item)
    }

    async fn fetch_open_reconciliation_items(&self) -> Result<Vec<ReconciliationItem>, ReconciliationError> {
        let state = self.lock().map_err(ReconciliationError::DatabaseError)?;
        // Ids are allocated in insertion order, so the map order is the age order.
        Ok(state.reconciliation.values().filter(|r| !r.is_resolved()).cloned().collect())
    }

    async fn resolve_reconciliation_item(
        &self,
        id: i64,
        outcome: LedgerOutcome,
        note: &str,
    ) -> Result<ReconciliationItem, ReconciliationError> {
        if outcome == LedgerOutcome::Duplicate {
            return Err(ReconciliationError::InvalidOutcome(outcome));
        }
        let mut guard = self.lock().map_err(ReconciliationError::DatabaseError)?;
        let state = &mut *guard;
        let item = state.reconciliation.get_mut(&id).ok_or(ReconciliationError::ItemNotFound(id))?;
        if item.is_resolved() {
            return Err(ReconciliationError::AlreadyResolved(id));
        }
        let record = state
            .ledger
            .get_mut(&item.key())
            .ok_or_else(|| ReconciliationError::DatabaseError(format!("No ledger entry for {}", item.key())))?;
        record.outcome = Some(outcome);
        item.resolved_at = Some(Utc::now());
        item.resolution_note = Some(note.to_string());
        info!("🗃️ Reconciliation item #{id} for {} resolved as {outcome}", item.key());
        Ok(item.clone())
    }
}
