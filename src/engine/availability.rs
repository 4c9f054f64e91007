use ulid::Ulid;

use crate::model::DayRange;

use super::store::Store;

/// Find a reservation occupying `item_id` somewhere in `range`.
///
/// Reservations in `cancelled` or `rejected` are out of the conflict set;
/// everything else (`pending`, `confirmed`, `finished`) blocks the calendar.
/// `exclude` lets an existing reservation be checked against all others but
/// itself when re-validating.
pub fn find_conflict(
    store: &Store,
    item_id: Ulid,
    range: &DayRange,
    exclude: Option<Ulid>,
) -> Option<Ulid> {
    store
        .reservations_for_item(item_id)
        .filter(|r| exclude != Some(r.id))
        .filter(|r| r.status.occupies())
        .find(|r| r.range.overlaps(range))
        .map(|r| r.id)
}

/// True if the item is free across the whole range.
pub fn is_available(
    store: &Store,
    item_id: Ulid,
    range: &DayRange,
    exclude: Option<Ulid>,
) -> bool {
    find_conflict(store, item_id, range, exclude).is_none()
}
