//! Input bounds. Everything a client can send is capped before it reaches
//! the store.

/// Longest accepted item name.
pub const MAX_NAME_LEN: usize = 200;

/// Longest accepted discount code (promo or voucher).
pub const MAX_CODE_LEN: usize = 40;

/// Longest accepted shipping reference string.
pub const MAX_SHIPPING_REF_LEN: usize = 500;

/// Widest accepted reservation range, in calendar days.
pub const MAX_RANGE_DAYS: i64 = 90;

/// Hard cap on rows returned by a listing query.
pub const MAX_LIST_ROWS: usize = 500;

/// Highest representable discount percentage.
pub const MAX_DISCOUNT_PERCENT: u8 = 100;

/// Catalog size cap.
pub const MAX_ITEMS: usize = 10_000;
