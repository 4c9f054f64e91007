use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::MAX_LIST_ROWS;
use crate::limits::MAX_RANGE_DAYS;
use crate::model::*;

use super::availability;
use super::discount::{self, RejectReason, Resolution};
use super::loyalty;
use super::pricing;
use super::{Engine, EngineError};

/// Admin listing filters. Every field is optional; unset means "any".
#[derive(Debug, Default, Clone)]
pub struct ReservationFilter {
    pub id: Option<Ulid>,
    pub status: Option<ReservationStatus>,
    pub customer_id: Option<Ulid>,
    pub item_id: Option<Ulid>,
    /// Reservations starting on or after this day.
    pub from: Option<NaiveDate>,
    /// Reservations ending on or before this day.
    pub to: Option<NaiveDate>,
    /// Case-insensitive needle matched against item name and discount code.
    pub text: Option<String>,
}

impl Engine {
    /// Price preview. Read-only and side-effect free: nothing is consumed,
    /// so quoting with a voucher never burns it.
    ///
    /// An invalid code quotes at 0% rather than failing — the authoritative
    /// check happens at creation, which does abort. Callers wanting the
    /// verdict use `resolve_discount`.
    pub async fn quote(
        &self,
        item_id: Ulid,
        range: DayRange,
        customer_id: Option<Ulid>,
        discount_code: Option<&str>,
        today: NaiveDate,
    ) -> Result<PricingQuote, EngineError> {
        if range.from < today {
            return Err(EngineError::Validation("dates must not be in the past"));
        }
        if range.days() > MAX_RANGE_DAYS {
            return Err(EngineError::LimitExceeded("date range too wide"));
        }
        let store = self.store.read().await;
        let item = store
            .item(&item_id)
            .filter(|i| i.active)
            .ok_or(EngineError::NotFound(item_id))?;
        let discount_percent = match discount::resolve(
            &store,
            customer_id,
            discount_code.unwrap_or(""),
            today,
        ) {
            Resolution::Applied(instrument) => instrument.discount_percent,
            _ => 0,
        };
        Ok(pricing::compute_quote(item.daily_rate, &range, discount_percent))
    }

    /// Resolver probe: verdict, kind, percent and rejection reason for a
    /// presented code. An owner's spent voucher reads as plain `not_found`
    /// here — only the create path distinguishes it.
    pub async fn resolve_discount(
        &self,
        customer_id: Option<Ulid>,
        code: &str,
        today: NaiveDate,
    ) -> Resolution {
        let store = self.store.read().await;
        match discount::resolve(&store, customer_id, code, today) {
            Resolution::VoucherSpent(_) => Resolution::Rejected(RejectReason::NotFound),
            other => other,
        }
    }

    /// Availability probe with the same conflict rule creation uses.
    pub async fn is_available(
        &self,
        item_id: Ulid,
        range: DayRange,
        exclude: Option<Ulid>,
    ) -> Result<bool, EngineError> {
        let store = self.store.read().await;
        if store.item(&item_id).is_none() {
            return Err(EngineError::NotFound(item_id));
        }
        Ok(availability::is_available(&store, item_id, &range, exclude))
    }

    /// Filtered listing, newest first, capped at 500 rows.
    pub async fn list_reservations(&self, filter: &ReservationFilter) -> Vec<ReservationRow> {
        let store = self.store.read().await;
        let needle = filter.text.as_ref().map(|t| t.to_lowercase());

        let mut rows: Vec<ReservationRow> = store
            .reservations_iter()
            .filter(|r| filter.id.is_none_or(|id| r.id == id))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.customer_id.is_none_or(|c| r.customer_id == c))
            .filter(|r| filter.item_id.is_none_or(|i| r.item_id == i))
            .filter(|r| filter.from.is_none_or(|d| r.range.from >= d))
            .filter(|r| filter.to.is_none_or(|d| r.range.to <= d))
            .map(|r| ReservationRow {
                reservation: r.clone(),
                item_name: store
                    .item(&r.item_id)
                    .map(|i| i.name.clone())
                    .unwrap_or_default(),
            })
            .filter(|row| {
                let Some(needle) = &needle else { return true };
                row.item_name.to_lowercase().contains(needle)
                    || row
                        .reservation
                        .discount_code
                        .as_ref()
                        .is_some_and(|c| c.to_lowercase().contains(needle))
            })
            .collect();

        rows.sort_by(|a, b| {
            (b.reservation.created_at, b.reservation.id)
                .cmp(&(a.reservation.created_at, a.reservation.id))
        });
        rows.truncate(MAX_LIST_ROWS);
        rows
    }

    pub async fn get_reservation(&self, id: Ulid) -> Option<Reservation> {
        self.store.read().await.reservation(&id).cloned()
    }

    /// Loyalty card summary for one customer.
    pub async fn loyalty_summary(&self, customer_id: Ulid) -> LoyaltySummary {
        let store = self.store.read().await;
        loyalty::summary(&store, customer_id)
    }

    /// All vouchers ever issued to the customer, newest first.
    pub async fn list_vouchers(&self, customer_id: Ulid) -> Vec<Voucher> {
        let store = self.store.read().await;
        let mut vouchers: Vec<Voucher> = store
            .vouchers_for_customer(customer_id)
            .cloned()
            .collect();
        vouchers.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        vouchers
    }

    pub async fn get_item(&self, id: Ulid) -> Option<Item> {
        self.store.read().await.item(&id).cloned()
    }

    pub async fn get_promo(&self, code: &str) -> Option<PromoCode> {
        self.store.read().await.promo(code).cloned()
    }

    /// Catalog listing, sorted by name.
    pub async fn list_items(&self) -> Vec<Item> {
        let store = self.store.read().await;
        let mut items: Vec<Item> = store.items_iter().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        items
    }
}
