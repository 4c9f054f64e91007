use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Inclusive calendar-day range `[from, to]`. A same-day rental is one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DayRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        debug_assert!(from <= to, "DayRange from must not be after to");
        Self { from, to }
    }

    /// Number of billable days (inclusive on both ends).
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    /// Inclusive interval intersection: `a.from <= b.to && a.to >= b.from`.
    pub fn overlaps(&self, other: &DayRange) -> bool {
        self.from <= other.to && self.to >= other.from
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }
}

/// Reservation lifecycle states. `pending` is the only initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
    Finished,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Finished => "finished",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReservationStatus::Pending),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "rejected" => Some(ReservationStatus::Rejected),
            "cancelled" => Some(ReservationStatus::Cancelled),
            "finished" => Some(ReservationStatus::Finished),
            _ => None,
        }
    }

    /// Whether a reservation in this state blocks the item's calendar.
    /// `pending` deliberately counts: it is a soft hold until an
    /// administrator decides or the sweep expires it.
    pub fn occupies(&self) -> bool {
        !matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::Rejected
        )
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit_card" => Some(PaymentMethod::CreditCard),
            "paypal" => Some(PaymentMethod::Paypal),
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            _ => None,
        }
    }

    /// Simulated settlement: card and PayPal are captured at creation,
    /// cash on delivery stays unpaid until an admin marks it.
    pub fn settles_immediately(&self) -> bool {
        matches!(self, PaymentMethod::CreditCard | PaymentMethod::Paypal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// One booking of one item by one customer. `unit_rate`, `discount_percent`,
/// `final_price` and `discount_code` are snapshots taken at creation; later
/// catalog or instrument changes never touch an existing reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub item_id: Ulid,
    pub range: DayRange,
    pub status: ReservationStatus,
    pub unit_rate: Decimal,
    pub discount_percent: u8,
    pub final_price: Decimal,
    pub discount_code: Option<String>,
    pub shipping_ref: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog entry: the rentable thing. The engine is the system of record for
/// the flag and rate the reservation core needs; richer catalog data (photos,
/// descriptions, reviews) lives with the web layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Ulid,
    pub name: String,
    pub daily_rate: Decimal,
    pub active: bool,
}

/// Shared, multi-use discount instrument. Validity is computed at resolution
/// time from the active flag and the optional date window, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub discount_percent: u8,
    pub starts_at: Option<NaiveDate>,
    pub expires_at: Option<NaiveDate>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoucherStatus {
    Available,
    Used,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Available => "available",
            VoucherStatus::Used => "used",
        }
    }
}

/// Customer-scoped, single-use discount instrument earned from completed
/// rentals. Transitions `available -> used` exactly once, tied to the
/// reservation that consumed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub code: String,
    pub discount_percent: u8,
    pub status: VoucherStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<NaiveDate>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_reservation_id: Option<Ulid>,
}

/// The event types — flat, no nesting. This is the WAL record format.
///
/// `ReservationCreated` carries the consumed voucher code so the insert and
/// the consumption are a single atomic record: replay can never observe one
/// without the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ItemCreated {
        id: Ulid,
        name: String,
        daily_rate: Decimal,
        active: bool,
    },
    ItemUpdated {
        id: Ulid,
        name: String,
        daily_rate: Decimal,
        active: bool,
    },
    PromoCreated {
        code: String,
        discount_percent: u8,
        starts_at: Option<NaiveDate>,
        expires_at: Option<NaiveDate>,
        active: bool,
    },
    PromoUpdated {
        code: String,
        discount_percent: u8,
        starts_at: Option<NaiveDate>,
        expires_at: Option<NaiveDate>,
        active: bool,
    },
    ReservationCreated {
        id: Ulid,
        customer_id: Ulid,
        item_id: Ulid,
        range: DayRange,
        unit_rate: Decimal,
        discount_percent: u8,
        final_price: Decimal,
        discount_code: Option<String>,
        /// Set iff the applied instrument was a loyalty voucher; apply flips
        /// that voucher to `used` in the same step as the insert.
        voucher_code: Option<String>,
        shipping_ref: String,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
        at: DateTime<Utc>,
    },
    ReservationStatusChanged {
        id: Ulid,
        to: ReservationStatus,
        at: DateTime<Utc>,
    },
    PaymentMarked {
        id: Ulid,
        status: PaymentStatus,
        at: DateTime<Utc>,
    },
    VoucherIssued {
        id: Ulid,
        customer_id: Ulid,
        code: String,
        discount_percent: u8,
        expires_at: Option<NaiveDate>,
        at: DateTime<Utc>,
    },
}

// ── Query result types ───────────────────────────────────────────

/// Price breakdown for a prospective reservation. Pure derivation; nothing
/// is persisted or consumed by computing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingQuote {
    pub days: i64,
    pub unit_rate: Decimal,
    pub subtotal: Decimal,
    pub discount_percent: u8,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

/// What `create_reservation` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedReservation {
    pub id: Ulid,
    pub discount_percent: u8,
    pub final_price: Decimal,
    pub payment_status: PaymentStatus,
    pub applied_voucher: bool,
}

/// Listing row: a reservation joined with its item's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRow {
    pub reservation: Reservation,
    pub item_name: String,
}

/// Loyalty card summary, original field set: `used` and `remaining_to_next`
/// are informational derivations for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltySummary {
    pub completed: u64,
    pub earned: u64,
    pub used: u64,
    pub available: u64,
    pub progress_in_cycle: u64,
    pub remaining_to_next: u64,
    pub discount_percent: u8,
}
