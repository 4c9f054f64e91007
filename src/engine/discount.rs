use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::VoucherStatus;

use super::store::Store;

/// Generated voucher codes carry this prefix; it is also what routes a
/// presented code to voucher resolution instead of promo resolution.
pub const VOUCHER_PREFIX: &str = "LCH-";

/// Why a presented code did not resolve. Voucher failures always collapse to
/// `NotFound` so voucher existence and ownership are never leaked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotFound,
    Inactive,
    NotStarted,
    Expired,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NotFound => "not_found",
            RejectReason::Inactive => "inactive",
            RejectReason::NotStarted => "not_started",
            RejectReason::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Promo,
    Voucher,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Promo => "promo",
            InstrumentKind::Voucher => "voucher",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstrument {
    pub code: String,
    pub discount_percent: u8,
    pub kind: InstrumentKind,
}

/// Outcome of resolving a presented code. Resolution is read-only; nothing
/// is consumed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Blank input — no instrument requested.
    None,
    Applied(ResolvedInstrument),
    Rejected(RejectReason),
    /// The caller's own voucher, already consumed. Creation surfaces this as
    /// `discount_already_used`; read paths must collapse it to a plain
    /// rejection.
    VoucherSpent(String),
}

/// Resolve a raw code against both instrument families. Input is trimmed and
/// compared case-insensitively. At most one instrument ever applies.
pub fn resolve(
    store: &Store,
    customer_id: Option<Ulid>,
    raw_code: &str,
    today: NaiveDate,
) -> Resolution {
    let trimmed = raw_code.trim();
    if trimmed.is_empty() {
        return Resolution::None;
    }
    if trimmed.to_uppercase().starts_with(VOUCHER_PREFIX) {
        resolve_voucher(store, customer_id, trimmed, today)
    } else {
        resolve_promo(store, trimmed, today)
    }
}

fn resolve_voucher(
    store: &Store,
    customer_id: Option<Ulid>,
    code: &str,
    today: NaiveDate,
) -> Resolution {
    let Some(voucher) = store.voucher(code) else {
        return Resolution::Rejected(RejectReason::NotFound);
    };
    // Wrong owner reads exactly like a nonexistent code.
    if customer_id != Some(voucher.customer_id) {
        return Resolution::Rejected(RejectReason::NotFound);
    }
    if voucher.status == VoucherStatus::Used {
        return Resolution::VoucherSpent(voucher.code.clone());
    }
    if let Some(expires_at) = voucher.expires_at
        && expires_at < today
    {
        return Resolution::Rejected(RejectReason::NotFound);
    }
    Resolution::Applied(ResolvedInstrument {
        code: voucher.code.clone(),
        discount_percent: voucher.discount_percent,
        kind: InstrumentKind::Voucher,
    })
}

/// Promo rejection reasons in priority order: not_found, inactive,
/// not_started, expired.
fn resolve_promo(store: &Store, code: &str, today: NaiveDate) -> Resolution {
    let Some(promo) = store.promo(code) else {
        return Resolution::Rejected(RejectReason::NotFound);
    };
    if !promo.active {
        return Resolution::Rejected(RejectReason::Inactive);
    }
    if let Some(starts_at) = promo.starts_at
        && today < starts_at
    {
        return Resolution::Rejected(RejectReason::NotStarted);
    }
    if let Some(expires_at) = promo.expires_at
        && today > expires_at
    {
        return Resolution::Rejected(RejectReason::Expired);
    }
    Resolution::Applied(ResolvedInstrument {
        code: promo.code.clone(),
        discount_percent: promo.discount_percent,
        kind: InstrumentKind::Promo,
    })
}
