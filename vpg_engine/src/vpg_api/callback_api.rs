use std::{fmt::Debug, future::Future, str::FromStr, time::Duration};

use chrono::Utc;
use log::*;

use crate::{
    db_types::{
        Amount,
        IdempotencyKey,
        IdempotencyRecord,
        LedgerOutcome,
        NewReconciliationItem,
        NewSale,
        ReconciliationReason,
    },
    events::{EventProducers, ReconciliationRequiredEvent, SaleFulfilledEvent},
    helpers::{decode_reference, DecodedReference, SignatureVerifier},
    traits::{
        ClaimResult,
        FulfillmentResult,
        IdempotencyLedger,
        InventoryManagement,
        LedgerError,
        ReconciliationManagement,
    },
    vpg_api::{
        callback_objects::{CallbackOutcome, PaymentNotification},
        errors::CallbackError,
    },
};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// The winner of a claim makes at most this many bounded store calls after the claim: fulfil and settle, then fetch the
/// sales, flag and settle again if it has to recover.
const STORE_CALLS_PER_CLAIM: u32 = 5;

/// `CallbackApi` runs the protocol for a single inbound gateway notification:
///
/// 1. Verify the signature. Nothing is written for a notification that fails.
/// 2. Claim the `(transaction id, reference)` key in the idempotency ledger. Only the delivery that wins the claim
///    goes on to touch inventory.
/// 3. Release one unit of stock and record the sale, atomically.
/// 4. Settle the ledger entry.
///
/// Paid notifications that cannot be fulfilled are queued for manual reconciliation rather than rejected, since the
/// customer's money has already moved.
///
/// Every store call is bounded by `store_timeout`. A claim whose processing is cut short by a store failure is
/// recovered, either straight away or by the first redelivery that arrives after the claim window has passed.
pub struct CallbackApi<B> {
    db: B,
    verifier: SignatureVerifier,
    store_timeout: Duration,
    producers: EventProducers,
}

impl<B> Debug for CallbackApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CallbackApi({:?}, timeout {:?})", self.verifier, self.store_timeout)
    }
}

impl<B> CallbackApi<B> {
    pub fn new(db: B, verifier: SignatureVerifier, store_timeout: Duration, producers: EventProducers) -> Self {
        Self { db, verifier, store_timeout, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// How long the winner of a claim can take to settle it. An unsettled claim older than this has been abandoned.
    pub fn claim_window(&self) -> Duration {
        self.store_timeout.saturating_mul(STORE_CALLS_PER_CLAIM)
    }

    fn is_abandoned(&self, record: &IdempotencyRecord) -> bool {
        record.outcome.is_none() &&
            (Utc::now() - record.first_seen_at).to_std().map(|age| age > self.claim_window()).unwrap_or(false)
    }

    async fn bounded<T, E, F>(&self, op: &'static str, fut: F) -> Result<T, CallbackError>
    where
        F: Future<Output = Result<T, E>>,
        CallbackError: From<E>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result.map_err(CallbackError::from),
            Err(_) => Err(CallbackError::Timeout(op)),
        }
    }
}

impl<B> CallbackApi<B>
where B: IdempotencyLedger + InventoryManagement + ReconciliationManagement
{
    /// Processes one notification. Running this any number of times, concurrently or not, with the same
    /// notification releases stock at most once.
    ///
    /// An `Err` is only ever a store failure or timeout. If the key was already claimed when the failure happened, the
    /// claim is recovered before the error is returned: a sale that did commit settles the key as fulfilled, and
    /// otherwise the payment is queued for reconciliation as `Interrupted`.
    pub async fn process_notification(
        &self,
        notification: PaymentNotification,
    ) -> Result<CallbackOutcome, CallbackError> {
        let signature = notification.signature.as_deref().unwrap_or_default();
        if !self.verifier.verify(&notification.fields, signature) {
            warn!(
                "🔐️ Rejected a gateway notification with an invalid signature. PaymentId: {:?}, RefNo: {:?}",
                notification.fields.transaction_id, notification.fields.reference
            );
            return Ok(CallbackOutcome::Rejected);
        }
        // A verified notification always carries both halves of the key.
        let Some(key) = notification.key() else {
            warn!("🔐️ Verified notification has no idempotency key. Treating it as forged.");
            return Ok(CallbackOutcome::Rejected);
        };
        if !notification.is_success() {
            info!(
                "🧾️ Payment {key} was not successful (status {:?}). Gateway says: {}",
                notification.fields.status,
                notification.error_description.as_deref().unwrap_or("no description")
            );
            return Ok(CallbackOutcome::Acknowledged);
        }
        self.process_paid(&key, &notification).await
    }

    async fn process_paid(
        &self,
        key: &IdempotencyKey,
        notification: &PaymentNotification,
    ) -> Result<CallbackOutcome, CallbackError> {
        match self.bounded("claim", self.db.claim(key)).await {
            Ok(ClaimResult::Claimed(_)) => trace!("🧾️ Payment {key} claimed"),
            Ok(ClaimResult::AlreadyClaimed(record)) if self.is_abandoned(&record) => {
                warn!("🧾️ Payment {key} was claimed at {} and never settled. Recovering it.", record.first_seen_at);
                return self.recover_interrupted(key).await;
            },
            Ok(ClaimResult::AlreadyClaimed(record)) => {
                info!("🧾️ Payment {key} is a duplicate delivery (#{}). Acknowledging.", record.deliveries);
                return Ok(CallbackOutcome::AlreadyProcessed);
            },
            Err(e) => {
                error!("🧾️ Could not claim payment {key}. The gateway will have to redeliver it. {e}");
                return Err(e);
            },
        }
        match self.fulfil_claimed(key, notification).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("🧾️ Processing of payment {key} failed after it was claimed. {e}");
                match self.recover_interrupted(key).await {
                    Ok(outcome) => info!("🧾️ Claim on payment {key} recovered as {outcome:?}"),
                    Err(recovery_err) => error!(
                        "🧾️ Could not recover the claim on payment {key}. A redelivery after {:?} will retry. \
                         {recovery_err}",
                        self.claim_window()
                    ),
                }
                Err(e)
            },
        }
    }

    async fn fulfil_claimed(
        &self,
        key: &IdempotencyKey,
        notification: &PaymentNotification,
    ) -> Result<CallbackOutcome, CallbackError> {
        let target = decode_reference(&key.reference);
        let raw_amount = notification.fields.amount.as_deref().unwrap_or_default();
        let amount = Amount::from_str(raw_amount);
        let currency = notification.fields.currency.as_deref().map(str::trim).unwrap_or_default();

        let (slot, amount) = match (target, amount) {
            (DecodedReference::Target(slot), Ok(amount)) => (slot, amount),
            (DecodedReference::Unresolved, _) => {
                warn!("🧾️ Payment {key} has a reference with no fulfilment target");
                let detail = format!("Reference '{}' does not name a slot", key.reference);
                return self.flag_and_reject(key, ReconciliationReason::MalformedReference, detail).await;
            },
            (DecodedReference::Target(_), Err(e)) => {
                warn!("🧾️ Payment {key} has an unusable amount. {e}");
                return self.flag_and_reject(key, ReconciliationReason::MalformedAmount, e.to_string()).await;
            },
        };

        let sale = NewSale::new(key, amount, currency);
        match self.bounded("fulfill", self.db.fulfill(&slot, sale)).await? {
            FulfillmentResult::Fulfilled(sale) => {
                self.bounded("settle", self.db.settle(key, LedgerOutcome::Fulfilled)).await?;
                info!("🧾️ Payment {key} fulfilled from slot {slot}. Sale #{} for {}", sale.id, sale.amount);
                self.producers.publish_sale_fulfilled(SaleFulfilledEvent::new(sale.clone())).await;
                Ok(CallbackOutcome::Fulfilled(sale))
            },
            FulfillmentResult::InsufficientStock => {
                warn!("🧾️ Payment {key} was made for slot {slot}, which is empty");
                let detail = format!("Slot {} had no stock", slot.as_str());
                self.flag_and_reject(key, ReconciliationReason::InsufficientStock, detail).await
            },
            FulfillmentResult::UnknownTarget => {
                warn!("🧾️ Payment {key} was made for slot {slot}, which does not exist");
                let detail = format!("Slot {} is not configured", slot.as_str());
                self.flag_and_reject(key, ReconciliationReason::UnknownTarget, detail).await
            },
        }
    }

    /// Settles a claim whose processing stopped part way. The sale, if one committed, is the source of truth.
    async fn recover_interrupted(&self, key: &IdempotencyKey) -> Result<CallbackOutcome, CallbackError> {
        let sales = self.bounded("fetch_sales", self.db.fetch_sales_for_reference(&key.reference)).await?;
        match sales.into_iter().find(|s| s.gateway_txn_id == key.gateway_txn_id) {
            Some(sale) => {
                if !self.settle_once(key, LedgerOutcome::Fulfilled).await? {
                    return Ok(CallbackOutcome::AlreadyProcessed);
                }
                info!("🧾️ Payment {key} had already been fulfilled as sale #{}. Ledger settled.", sale.id);
                self.producers.publish_sale_fulfilled(SaleFulfilledEvent::new(sale.clone())).await;
                Ok(CallbackOutcome::Fulfilled(sale))
            },
            None => {
                let detail = format!("Processing stopped after the claim on {key}, and no sale was recorded");
                self.flag_and_reject(key, ReconciliationReason::Interrupted, detail).await
            },
        }
    }

    async fn flag_and_reject(
        &self,
        key: &IdempotencyKey,
        reason: ReconciliationReason,
        detail: String,
    ) -> Result<CallbackOutcome, CallbackError> {
        let new_item = NewReconciliationItem::new(key.clone(), reason, detail);
        let item = self.bounded("flag", self.db.flag_for_reconciliation(new_item)).await?;
        if !self.settle_once(key, LedgerOutcome::Rejected).await? {
            return Ok(CallbackOutcome::AlreadyProcessed);
        }
        info!("🧾️ Payment {key} queued for reconciliation as item #{} ({reason})", item.id);
        self.producers.publish_reconciliation_required(ReconciliationRequiredEvent::new(item)).await;
        Ok(CallbackOutcome::FulfillmentFailed { reason })
    }

    /// Returns `false` if another delivery settled the key first.
    async fn settle_once(&self, key: &IdempotencyKey, outcome: LedgerOutcome) -> Result<bool, CallbackError> {
        match tokio::time::timeout(self.store_timeout, self.db.settle(key, outcome)).await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(LedgerError::AlreadySettled(_))) => {
                debug!("🧾️ Payment {key} was settled by another delivery");
                Ok(false)
            },
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(CallbackError::Timeout("settle")),
        }
    }
}
