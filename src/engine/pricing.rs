use rust_decimal::{Decimal, RoundingStrategy};

use crate::model::{DayRange, PricingQuote};

/// Half-away-from-zero rounding to 2 decimal places. The result is pinned
/// to scale 2 so `0` renders as `0.00` everywhere it is displayed.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Derive the price breakdown for a range at a daily rate.
///
/// Rounding is applied independently at every derived value — not just the
/// total — so persisted figures always equal what a price preview displayed.
/// Pure function: free to call for previews, nothing is persisted.
pub fn compute_quote(unit_rate: Decimal, range: &DayRange, discount_percent: u8) -> PricingQuote {
    let days = range.days();
    let subtotal = round2(unit_rate * Decimal::from(days));
    let discount_amount =
        round2(subtotal * Decimal::from(discount_percent) / Decimal::ONE_HUNDRED);
    let total = round2(subtotal - discount_amount);
    PricingQuote {
        days,
        unit_rate,
        subtotal,
        discount_percent,
        discount_amount,
        total,
    }
}
