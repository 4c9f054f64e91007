use std::collections::HashMap;

use ulid::Ulid;

use crate::model::*;

/// In-memory tables plus the indexes the overlap and history queries need.
/// The only way state changes is `apply_event` — the same code path serves
/// live mutations and WAL replay, so both always agree.
#[derive(Default)]
pub struct Store {
    items: HashMap<Ulid, Item>,
    reservations: HashMap<Ulid, Reservation>,
    /// Keyed by uppercased code.
    promos: HashMap<String, PromoCode>,
    /// Keyed by uppercased code.
    vouchers: HashMap<String, Voucher>,
    by_item: HashMap<Ulid, Vec<Ulid>>,
    by_customer: HashMap<Ulid, Vec<Ulid>>,
    vouchers_by_customer: HashMap<Ulid, Vec<String>>,
}

impl Store {
    // ── Items ────────────────────────────────────────────────

    pub fn item(&self, id: &Ulid) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn items_iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    // ── Reservations ─────────────────────────────────────────

    pub fn reservation(&self, id: &Ulid) -> Option<&Reservation> {
        self.reservations.get(id)
    }

    pub fn reservations_iter(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    pub fn reservations_for_item(&self, item_id: Ulid) -> impl Iterator<Item = &Reservation> {
        self.by_item
            .get(&item_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.reservations.get(id))
    }

    pub fn reservations_for_customer(&self, customer_id: Ulid) -> impl Iterator<Item = &Reservation> {
        self.by_customer
            .get(&customer_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.reservations.get(id))
    }

    // ── Discount instruments ─────────────────────────────────

    /// Lookup by code, case-insensitive.
    pub fn promo(&self, code: &str) -> Option<&PromoCode> {
        self.promos.get(&code.to_uppercase())
    }

    pub fn promos_iter(&self) -> impl Iterator<Item = &PromoCode> {
        self.promos.values()
    }

    /// Lookup by code, case-insensitive.
    pub fn voucher(&self, code: &str) -> Option<&Voucher> {
        self.vouchers.get(&code.to_uppercase())
    }

    pub fn vouchers_for_customer(&self, customer_id: Ulid) -> impl Iterator<Item = &Voucher> {
        self.vouchers_by_customer
            .get(&customer_id)
            .into_iter()
            .flatten()
            .filter_map(|code| self.vouchers.get(code))
    }

    /// Vouchers ever issued to this customer, regardless of status.
    pub fn vouchers_issued_count(&self, customer_id: Ulid) -> u64 {
        self.vouchers_by_customer
            .get(&customer_id)
            .map_or(0, |codes| codes.len() as u64)
    }

    // ── Event application ────────────────────────────────────

    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::ItemCreated { id, name, daily_rate, active }
            | Event::ItemUpdated { id, name, daily_rate, active } => {
                self.items.insert(
                    *id,
                    Item {
                        id: *id,
                        name: name.clone(),
                        daily_rate: *daily_rate,
                        active: *active,
                    },
                );
            }
            Event::PromoCreated { code, discount_percent, starts_at, expires_at, active }
            | Event::PromoUpdated { code, discount_percent, starts_at, expires_at, active } => {
                self.promos.insert(
                    code.to_uppercase(),
                    PromoCode {
                        code: code.clone(),
                        discount_percent: *discount_percent,
                        starts_at: *starts_at,
                        expires_at: *expires_at,
                        active: *active,
                    },
                );
            }
            Event::ReservationCreated {
                id,
                customer_id,
                item_id,
                range,
                unit_rate,
                discount_percent,
                final_price,
                discount_code,
                voucher_code,
                shipping_ref,
                payment_method,
                payment_status,
                at,
            } => {
                self.reservations.insert(
                    *id,
                    Reservation {
                        id: *id,
                        customer_id: *customer_id,
                        item_id: *item_id,
                        range: *range,
                        status: ReservationStatus::Pending,
                        unit_rate: *unit_rate,
                        discount_percent: *discount_percent,
                        final_price: *final_price,
                        discount_code: discount_code.clone(),
                        shipping_ref: shipping_ref.clone(),
                        payment_method: *payment_method,
                        payment_status: *payment_status,
                        created_at: *at,
                        updated_at: *at,
                    },
                );
                self.by_item.entry(*item_id).or_default().push(*id);
                self.by_customer.entry(*customer_id).or_default().push(*id);

                // The consumption travels in the same record as the insert.
                if let Some(code) = voucher_code
                    && let Some(v) = self.vouchers.get_mut(&code.to_uppercase())
                    && v.status == VoucherStatus::Available
                {
                    v.status = VoucherStatus::Used;
                    v.used_at = Some(*at);
                    v.used_reservation_id = Some(*id);
                }
            }
            Event::ReservationStatusChanged { id, to, at } => {
                if let Some(r) = self.reservations.get_mut(id) {
                    r.status = *to;
                    r.updated_at = *at;
                }
            }
            Event::PaymentMarked { id, status, at } => {
                if let Some(r) = self.reservations.get_mut(id) {
                    r.payment_status = *status;
                    r.updated_at = *at;
                }
            }
            Event::VoucherIssued { id, customer_id, code, discount_percent, expires_at, at } => {
                let key = code.to_uppercase();
                self.vouchers.insert(
                    key.clone(),
                    Voucher {
                        id: *id,
                        customer_id: *customer_id,
                        code: code.clone(),
                        discount_percent: *discount_percent,
                        status: VoucherStatus::Available,
                        created_at: *at,
                        expires_at: *expires_at,
                        used_at: None,
                        used_reservation_id: None,
                    },
                );
                self.vouchers_by_customer
                    .entry(*customer_id)
                    .or_default()
                    .push(key);
            }
        }
    }

    /// Minimal event sequence that recreates the current state. Vouchers are
    /// emitted before reservations so a replayed `ReservationCreated` finds
    /// the voucher it consumed.
    pub fn snapshot_events(&self) -> Vec<Event> {
        let mut events = Vec::new();

        for item in self.items.values() {
            events.push(Event::ItemCreated {
                id: item.id,
                name: item.name.clone(),
                daily_rate: item.daily_rate,
                active: item.active,
            });
        }
        for promo in self.promos.values() {
            events.push(Event::PromoCreated {
                code: promo.code.clone(),
                discount_percent: promo.discount_percent,
                starts_at: promo.starts_at,
                expires_at: promo.expires_at,
                active: promo.active,
            });
        }
        for v in self.vouchers.values() {
            events.push(Event::VoucherIssued {
                id: v.id,
                customer_id: v.customer_id,
                code: v.code.clone(),
                discount_percent: v.discount_percent,
                expires_at: v.expires_at,
                at: v.created_at,
            });
        }

        let mut reservations: Vec<&Reservation> = self.reservations.values().collect();
        reservations.sort_by_key(|r| (r.created_at, r.id));
        for r in reservations {
            // Voucher codes are recognizable by prefix; promos may not use it.
            let voucher_code = r
                .discount_code
                .as_ref()
                .filter(|c| {
                    c.to_uppercase().starts_with(super::discount::VOUCHER_PREFIX)
                })
                .cloned();
            events.push(Event::ReservationCreated {
                id: r.id,
                customer_id: r.customer_id,
                item_id: r.item_id,
                range: r.range,
                unit_rate: r.unit_rate,
                discount_percent: r.discount_percent,
                final_price: r.final_price,
                discount_code: r.discount_code.clone(),
                voucher_code,
                shipping_ref: r.shipping_ref.clone(),
                payment_method: r.payment_method,
                payment_status: r.payment_status,
                at: r.created_at,
            });
            if r.status != ReservationStatus::Pending {
                events.push(Event::ReservationStatusChanged {
                    id: r.id,
                    to: r.status,
                    at: r.updated_at,
                });
            }
        }

        events
    }
}
