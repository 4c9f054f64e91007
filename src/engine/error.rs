use ulid::Ulid;

use crate::model::ReservationStatus;

use super::discount::RejectReason;

#[derive(Debug)]
pub enum EngineError {
    /// Malformed or out-of-bounds input. Rejected before any state is touched.
    Validation(&'static str),
    NotFound(Ulid),
    CodeNotFound(String),
    AlreadyExists(String),
    /// The requested range overlaps an occupying reservation.
    Unavailable { item_id: Ulid, conflicting: Ulid },
    /// A non-empty discount code failed to resolve.
    InvalidDiscount(RejectReason),
    /// The caller's voucher was consumed by another reservation. Retryable
    /// with a fresh quote.
    DiscountAlreadyUsed(String),
    IllegalTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    /// Stable machine-readable reason token for callers.
    pub fn reason(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::NotFound(_) | EngineError::CodeNotFound(_) => "not_found",
            EngineError::AlreadyExists(_) => "already_exists",
            EngineError::Unavailable { .. } => "unavailable",
            EngineError::InvalidDiscount(_) => "invalid_discount",
            EngineError::DiscountAlreadyUsed(_) => "discount_already_used",
            EngineError::IllegalTransition { .. } => "illegal_transition",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::WalError(_) => "internal",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation: {msg}"),
            EngineError::NotFound(id) => write!(f, "not_found: {id}"),
            EngineError::CodeNotFound(code) => write!(f, "not_found: {code}"),
            EngineError::AlreadyExists(key) => write!(f, "already_exists: {key}"),
            EngineError::Unavailable { item_id, conflicting } => {
                write!(f, "unavailable: item {item_id} conflicts with reservation {conflicting}")
            }
            EngineError::InvalidDiscount(reason) => {
                write!(f, "invalid_discount: {}", reason.as_str())
            }
            EngineError::DiscountAlreadyUsed(code) => {
                write!(f, "discount_already_used: {code}")
            }
            EngineError::IllegalTransition { from, to } => {
                write!(f, "illegal_transition: {from} -> {to}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
