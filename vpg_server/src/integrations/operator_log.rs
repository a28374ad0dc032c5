use futures::future::BoxFuture;
use log::*;
use vpg_engine::events::{EventHandlers, EventHooks, ReconciliationRequiredEvent, SaleFulfilledEvent};

pub const OPERATOR_LOG_BUFFER_SIZE: usize = 25;

/// Assigns the event handlers that report engine events in the operator log (target `vpg::operator`).
///
/// 1. SaleFulfilledEvent - one line per released item, so the kiosk's dispense history can be read back from the logs.
/// 2. ReconciliationRequiredEvent - a warning for every paid notification that was queued instead of fulfilled. These
///    are customers who paid and did not receive an item.
pub fn create_operator_log_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_sale_fulfilled(|ev| log_sale(ev));
    hooks.on_reconciliation_required(|ev| log_reconciliation(ev));
    EventHandlers::new(OPERATOR_LOG_BUFFER_SIZE, hooks)
}

fn log_sale(ev: SaleFulfilledEvent) -> BoxFuture<'static, ()> {
    let sale = ev.sale;
    Box::pin(async move {
        info!(
            target: "vpg::operator",
            "📬️ Sale #{} released one item from {} for {} {} (reference {}, gateway txn {})",
            sale.id, sale.slot_id, sale.amount, sale.currency, sale.reference, sale.gateway_txn_id
        );
    })
}

fn log_reconciliation(ev: ReconciliationRequiredEvent) -> BoxFuture<'static, ()> {
    let key = ev.key();
    let item = ev.item;
    Box::pin(async move {
        warn!(
            target: "vpg::operator",
            "📬️ Payment {key} needs reconciliation (item #{}). Reason: {}. {}",
            item.id, item.reason, item.detail
        );
    })
}
