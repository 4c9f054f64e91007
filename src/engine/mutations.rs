use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::oneshot;
use tracing::warn;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::find_conflict;
use super::discount::{self, InstrumentKind, Resolution};
use super::loyalty;
use super::pricing;
use super::store::Store;
use super::{Engine, EngineError, WalCommand};

/// Input to `create_reservation`. The id is chosen by the caller so retries
/// after a transport failure can be made idempotent.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub item_id: Ulid,
    pub range: DayRange,
    pub discount_code: Option<String>,
    pub shipping_ref: String,
    pub payment_method: PaymentMethod,
}

/// Totals of one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    pub cancelled: usize,
    pub finished: usize,
    pub vouchers_issued: usize,
}

impl Engine {
    // ── Catalog & promo administration ───────────────────────

    pub async fn create_item(
        &self,
        id: Ulid,
        name: String,
        daily_rate: Decimal,
        active: bool,
    ) -> Result<(), EngineError> {
        validate_item_fields(&name, daily_rate)?;
        let mut store = self.store.write().await;
        if store.item_count() >= MAX_ITEMS {
            return Err(EngineError::LimitExceeded("too many items"));
        }
        if store.item(&id).is_some() {
            return Err(EngineError::AlreadyExists(id.to_string()));
        }
        let event = Event::ItemCreated { id, name, daily_rate, active };
        self.persist_and_apply(&mut store, &event).await
    }

    pub async fn update_item(
        &self,
        id: Ulid,
        name: String,
        daily_rate: Decimal,
        active: bool,
    ) -> Result<(), EngineError> {
        validate_item_fields(&name, daily_rate)?;
        let mut store = self.store.write().await;
        if store.item(&id).is_none() {
            return Err(EngineError::NotFound(id));
        }
        let event = Event::ItemUpdated { id, name, daily_rate, active };
        self.persist_and_apply(&mut store, &event).await
    }

    pub async fn create_promo(
        &self,
        code: String,
        discount_percent: u8,
        starts_at: Option<NaiveDate>,
        expires_at: Option<NaiveDate>,
        active: bool,
    ) -> Result<(), EngineError> {
        validate_promo_fields(&code, discount_percent, starts_at, expires_at)?;
        let mut store = self.store.write().await;
        if store.promo(&code).is_some() {
            return Err(EngineError::AlreadyExists(code));
        }
        let event = Event::PromoCreated { code, discount_percent, starts_at, expires_at, active };
        self.persist_and_apply(&mut store, &event).await
    }

    pub async fn update_promo(
        &self,
        code: String,
        discount_percent: u8,
        starts_at: Option<NaiveDate>,
        expires_at: Option<NaiveDate>,
        active: bool,
    ) -> Result<(), EngineError> {
        validate_promo_fields(&code, discount_percent, starts_at, expires_at)?;
        let mut store = self.store.write().await;
        if store.promo(&code).is_none() {
            return Err(EngineError::CodeNotFound(code));
        }
        let event = Event::PromoUpdated { code, discount_percent, starts_at, expires_at, active };
        self.persist_and_apply(&mut store, &event).await
    }

    // ── Reservation lifecycle ────────────────────────────────

    /// Create a reservation atomically: resolve the discount instrument,
    /// re-check availability, snapshot the price, insert the row and consume
    /// the voucher (if any) — all under one write guard, committed as one
    /// WAL record. On any failure nothing is journaled and nothing changes.
    pub async fn create_reservation(
        &self,
        req: NewReservation,
        today: NaiveDate,
    ) -> Result<CreatedReservation, EngineError> {
        let shipping_ref = req.shipping_ref.trim().to_string();
        if shipping_ref.is_empty() {
            return Err(EngineError::Validation("missing shipping reference"));
        }
        if shipping_ref.len() > MAX_SHIPPING_REF_LEN {
            return Err(EngineError::Validation("shipping reference too long"));
        }
        if req.range.from < today {
            return Err(EngineError::Validation("dates must not be in the past"));
        }
        if req.range.days() > MAX_RANGE_DAYS {
            return Err(EngineError::LimitExceeded("date range too wide"));
        }
        if let Some(code) = &req.discount_code
            && code.len() > MAX_CODE_LEN
        {
            return Err(EngineError::Validation("discount code too long"));
        }

        let mut store = self.store.write().await;

        let item = store
            .item(&req.item_id)
            .filter(|i| i.active)
            .cloned()
            .ok_or(EngineError::NotFound(req.item_id))?;

        if store.reservation(&req.id).is_some() {
            return Err(EngineError::AlreadyExists(req.id.to_string()));
        }

        // Resolve inside the exclusive section: between this check and the
        // apply below nothing else can consume the voucher, so the flip is
        // the conditional update the single-use guarantee needs.
        let resolved = match discount::resolve(
            &store,
            Some(req.customer_id),
            req.discount_code.as_deref().unwrap_or(""),
            today,
        ) {
            Resolution::None => None,
            Resolution::Applied(instrument) => Some(instrument),
            Resolution::Rejected(reason) => return Err(EngineError::InvalidDiscount(reason)),
            Resolution::VoucherSpent(code) => {
                return Err(EngineError::DiscountAlreadyUsed(code));
            }
        };

        if let Some(conflicting) = find_conflict(&store, req.item_id, &req.range, None) {
            return Err(EngineError::Unavailable { item_id: req.item_id, conflicting });
        }

        let discount_percent = resolved.as_ref().map_or(0, |r| r.discount_percent);
        let quote = pricing::compute_quote(item.daily_rate, &req.range, discount_percent);
        let payment_status = if req.payment_method.settles_immediately() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        };
        let (discount_code, voucher_code) = match &resolved {
            Some(r) => (
                Some(r.code.clone()),
                (r.kind == InstrumentKind::Voucher).then(|| r.code.clone()),
            ),
            None => (None, None),
        };
        let applied_voucher = voucher_code.is_some();

        let event = Event::ReservationCreated {
            id: req.id,
            customer_id: req.customer_id,
            item_id: req.item_id,
            range: req.range,
            unit_rate: item.daily_rate,
            discount_percent,
            final_price: quote.total,
            discount_code,
            voucher_code,
            shipping_ref,
            payment_method: req.payment_method,
            payment_status,
            at: Utc::now(),
        };
        self.persist_and_apply(&mut store, &event).await?;

        Ok(CreatedReservation {
            id: req.id,
            discount_percent,
            final_price: quote.total,
            payment_status,
            applied_voucher,
        })
    }

    /// Manual administrator transition. The table is strict:
    ///
    /// | from      | to        | precondition          |
    /// |-----------|-----------|-----------------------|
    /// | pending   | confirmed | —                     |
    /// | pending   | rejected  | —                     |
    /// | confirmed | cancelled | today < date_from     |
    /// | confirmed | finished  | today >= date_from    |
    ///
    /// A transition into `finished` tops up the customer's loyalty vouchers.
    pub async fn admin_transition(
        &self,
        reservation_id: Ulid,
        target: ReservationStatus,
        today: NaiveDate,
    ) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        let current = store
            .reservation(&reservation_id)
            .cloned()
            .ok_or(EngineError::NotFound(reservation_id))?;

        let allowed = match (current.status, target) {
            (ReservationStatus::Pending, ReservationStatus::Confirmed)
            | (ReservationStatus::Pending, ReservationStatus::Rejected) => true,
            (ReservationStatus::Confirmed, ReservationStatus::Cancelled) => {
                today < current.range.from
            }
            (ReservationStatus::Confirmed, ReservationStatus::Finished) => {
                today >= current.range.from
            }
            _ => false,
        };
        if !allowed {
            return Err(EngineError::IllegalTransition {
                from: current.status,
                to: target,
            });
        }

        let event = Event::ReservationStatusChanged {
            id: reservation_id,
            to: target,
            at: Utc::now(),
        };
        self.persist_and_apply(&mut store, &event).await?;

        if target == ReservationStatus::Finished {
            self.top_up_vouchers(&mut store, current.customer_id).await?;
        }
        Ok(())
    }

    /// Customer-initiated cancellation. Ownership mismatches read as
    /// `not_found`; `finished` and `rejected` reservations cannot be
    /// cancelled; a `confirmed` rental that has already started cannot be
    /// cancelled either. Cancelling twice is a no-op.
    pub async fn cancel_reservation(
        &self,
        customer_id: Ulid,
        reservation_id: Ulid,
        today: NaiveDate,
    ) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        let current = store
            .reservation(&reservation_id)
            .cloned()
            .ok_or(EngineError::NotFound(reservation_id))?;
        if current.customer_id != customer_id {
            return Err(EngineError::NotFound(reservation_id));
        }

        match current.status {
            ReservationStatus::Finished | ReservationStatus::Rejected => {
                Err(EngineError::IllegalTransition {
                    from: current.status,
                    to: ReservationStatus::Cancelled,
                })
            }
            ReservationStatus::Cancelled => Ok(()),
            ReservationStatus::Confirmed if today >= current.range.from => {
                Err(EngineError::IllegalTransition {
                    from: current.status,
                    to: ReservationStatus::Cancelled,
                })
            }
            _ => {
                let event = Event::ReservationStatusChanged {
                    id: reservation_id,
                    to: ReservationStatus::Cancelled,
                    at: Utc::now(),
                };
                self.persist_and_apply(&mut store, &event).await
            }
        }
    }

    /// Flip payment to `paid` (cash settled on delivery). Idempotent.
    pub async fn mark_paid(&self, reservation_id: Ulid) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        let current = store
            .reservation(&reservation_id)
            .cloned()
            .ok_or(EngineError::NotFound(reservation_id))?;
        if current.payment_status == PaymentStatus::Paid {
            return Ok(());
        }
        let event = Event::PaymentMarked {
            id: reservation_id,
            status: PaymentStatus::Paid,
            at: Utc::now(),
        };
        self.persist_and_apply(&mut store, &event).await
    }

    // ── Sweep ────────────────────────────────────────────────

    /// Advance every time-expired reservation: `pending` past its end date
    /// becomes `cancelled`, `confirmed` past its end date becomes `finished`
    /// (and earns loyalty credit). Idempotent — a second pass with the same
    /// date finds nothing to do. Per-row failures are logged and skipped so
    /// one bad row never stalls the rest of the sweep.
    pub async fn sweep(&self, today: NaiveDate) -> SweepOutcome {
        let mut store = self.store.write().await;

        let due: Vec<(Ulid, Ulid, ReservationStatus)> = store
            .reservations_iter()
            .filter(|r| r.range.to < today)
            .filter_map(|r| match r.status {
                ReservationStatus::Pending => {
                    Some((r.id, r.customer_id, ReservationStatus::Cancelled))
                }
                ReservationStatus::Confirmed => {
                    Some((r.id, r.customer_id, ReservationStatus::Finished))
                }
                _ => None,
            })
            .collect();

        let mut outcome = SweepOutcome::default();
        for (id, customer_id, target) in due {
            let event = Event::ReservationStatusChanged {
                id,
                to: target,
                at: Utc::now(),
            };
            if let Err(e) = self.persist_and_apply(&mut store, &event).await {
                warn!("sweep skipped reservation {id}: {e}");
                continue;
            }
            metrics::counter!(
                crate::observability::SWEEP_TRANSITIONS_TOTAL,
                "to" => target.as_str()
            )
            .increment(1);
            match target {
                ReservationStatus::Cancelled => outcome.cancelled += 1,
                ReservationStatus::Finished => {
                    outcome.finished += 1;
                    match self.top_up_vouchers(&mut store, customer_id).await {
                        Ok(issued) => outcome.vouchers_issued += issued.len(),
                        Err(e) => warn!("voucher top-up failed for {customer_id}: {e}"),
                    }
                }
                _ => {}
            }
        }
        outcome
    }

    // ── Loyalty issuance ─────────────────────────────────────

    /// Bring the customer's issued-voucher count up to their entitlement.
    /// Idempotent: with no new completions the second call issues nothing.
    pub async fn ensure_vouchers_issued(
        &self,
        customer_id: Ulid,
    ) -> Result<Vec<Voucher>, EngineError> {
        let mut store = self.store.write().await;
        self.top_up_vouchers(&mut store, customer_id).await
    }

    async fn top_up_vouchers(
        &self,
        store: &mut Store,
        customer_id: Ulid,
    ) -> Result<Vec<Voucher>, EngineError> {
        let missing = loyalty::missing_vouchers(store, customer_id);
        let mut created = Vec::with_capacity(missing as usize);
        for _ in 0..missing {
            let code = loyalty::generate_code(store);
            let event = Event::VoucherIssued {
                id: Ulid::new(),
                customer_id,
                code: code.clone(),
                discount_percent: loyalty::REWARD_DISCOUNT_PERCENT,
                expires_at: None,
                at: Utc::now(),
            };
            self.persist_and_apply(store, &event).await?;
            metrics::counter!(crate::observability::VOUCHERS_ISSUED_TOTAL).increment(1);
            if let Some(v) = store.voucher(&code) {
                created.push(v.clone());
            }
        }
        Ok(created)
    }

    // ── WAL maintenance ──────────────────────────────────────

    /// Rewrite the WAL with the minimal event set recreating current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let events = {
            let store = self.store.read().await;
            store.snapshot_events()
        };
        let (tx, rx) = oneshot::channel();
        self.send_wal_command(WalCommand::Compact { events, response: tx })
            .await?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .send_wal_command(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

fn validate_item_fields(name: &str, daily_rate: Decimal) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation("missing item name"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::Validation("item name too long"));
    }
    if daily_rate < Decimal::ZERO {
        return Err(EngineError::Validation("daily rate must not be negative"));
    }
    Ok(())
}

fn validate_promo_fields(
    code: &str,
    discount_percent: u8,
    starts_at: Option<NaiveDate>,
    expires_at: Option<NaiveDate>,
) -> Result<(), EngineError> {
    if code.trim().is_empty() || code.len() > MAX_CODE_LEN {
        return Err(EngineError::Validation("bad promo code"));
    }
    // The prefix routes codes to voucher resolution; a promo wearing it
    // would be unreachable.
    if code.to_uppercase().starts_with(discount::VOUCHER_PREFIX) {
        return Err(EngineError::Validation("code prefix reserved for vouchers"));
    }
    if discount_percent > MAX_DISCOUNT_PERCENT {
        return Err(EngineError::Validation("discount percent above 100"));
    }
    if let (Some(s), Some(e)) = (starts_at, expires_at)
        && e < s
    {
        return Err(EngineError::Validation("promo window ends before it starts"));
    }
    Ok(())
}
