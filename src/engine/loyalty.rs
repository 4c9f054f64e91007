use ulid::Ulid;

use crate::model::{LoyaltySummary, ReservationStatus, VoucherStatus};

use super::discount::VOUCHER_PREFIX;
use super::store::Store;

/// One voucher per this many completed rentals.
pub const REWARD_EVERY: u64 = 2;

/// Fixed reward value carried by every issued voucher.
pub const REWARD_DISCOUNT_PERCENT: u8 = 10;

/// Rentals that have reached `finished` — the only status that counts toward
/// the reward cadence. Always recomputed from the reservation aggregate,
/// never cached, so retries and out-of-order completions stay correct.
pub fn completed_count(store: &Store, customer_id: Ulid) -> u64 {
    store
        .reservations_for_customer(customer_id)
        .filter(|r| r.status == ReservationStatus::Finished)
        .count() as u64
}

pub fn entitled(completed: u64) -> u64 {
    completed / REWARD_EVERY
}

/// Vouchers owed: entitlement minus everything ever issued (any status).
/// Extras are never revoked, so this saturates at zero.
pub(super) fn missing_vouchers(store: &Store, customer_id: Ulid) -> u64 {
    entitled(completed_count(store, customer_id))
        .saturating_sub(store.vouchers_issued_count(customer_id))
}

/// New voucher code: the prefix plus the six trailing Crockford characters of
/// a fresh ULID (its randomness tail). Retries on the unlikely collision.
pub(super) fn generate_code(store: &Store) -> String {
    loop {
        let ulid = Ulid::new().to_string();
        let code = format!("{VOUCHER_PREFIX}{}", &ulid[ulid.len() - 6..]);
        if store.voucher(&code).is_none() {
            return code;
        }
    }
}

/// Card summary shown to the customer. `used` and `remaining_to_next` are
/// display derivations, not stored state.
pub fn summary(store: &Store, customer_id: Ulid) -> LoyaltySummary {
    let completed = completed_count(store, customer_id);
    let earned = entitled(completed);
    let available = store
        .vouchers_for_customer(customer_id)
        .filter(|v| v.status == VoucherStatus::Available)
        .count() as u64;
    let progress_in_cycle = completed % REWARD_EVERY;
    let remaining_to_next = if available > 0 {
        0
    } else {
        REWARD_EVERY - progress_in_cycle
    };
    LoyaltySummary {
        completed,
        earned,
        used: earned.saturating_sub(available),
        available,
        progress_in_cycle,
        remaining_to_next,
        discount_percent: REWARD_DISCOUNT_PERCENT,
    }
}
