use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::model::*;

use super::*;

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("castellan_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn today() -> NaiveDate {
    d(2024, 6, 1)
}

fn range(from_day: u32, to_day: u32) -> DayRange {
    DayRange::new(d(2024, 6, from_day), d(2024, 6, to_day))
}

async fn engine_with_item(name: &str, rate: &str) -> (Engine, Ulid) {
    let engine = Engine::new(test_wal_path(name)).unwrap();
    let item = Ulid::new();
    engine
        .create_item(item, "Castello Drago".into(), dec(rate), true)
        .await
        .unwrap();
    (engine, item)
}

fn request(item: Ulid, code: Option<&str>) -> NewReservation {
    NewReservation {
        id: Ulid::new(),
        customer_id: Ulid::new(),
        item_id: item,
        range: range(10, 12),
        discount_code: code.map(String::from),
        shipping_ref: "Via Roma 1, Torino (10121)".into(),
        payment_method: PaymentMethod::CashOnDelivery,
    }
}

async fn seed_promo(engine: &Engine, code: &str, percent: u8) {
    engine
        .create_promo(code.into(), percent, None, None, true)
        .await
        .unwrap();
}

/// Drive one reservation all the way to `finished`.
async fn finish_one(engine: &Engine, customer: Ulid, item: Ulid, from_day: u32, to_day: u32) {
    let id = Ulid::new();
    engine
        .create_reservation(
            NewReservation {
                id,
                customer_id: customer,
                item_id: item,
                range: range(from_day, to_day),
                discount_code: None,
                shipping_ref: "Corso Vittorio 12, Torino (10125)".into(),
                payment_method: PaymentMethod::CreditCard,
            },
            today(),
        )
        .await
        .unwrap();
    engine
        .admin_transition(id, ReservationStatus::Confirmed, today())
        .await
        .unwrap();
    engine
        .admin_transition(id, ReservationStatus::Finished, d(2024, 6, to_day))
        .await
        .unwrap();
}

// ── Creation & price snapshots ───────────────────────────

#[tokio::test]
async fn create_snapshots_price() {
    let (engine, item) = engine_with_item("create_snapshot.wal", "100.00").await;

    let req = request(item, None);
    let created = engine.create_reservation(req.clone(), today()).await.unwrap();
    assert_eq!(created.final_price, dec("300.00"));
    assert_eq!(created.discount_percent, 0);

    // A later rate change never touches the stored snapshot.
    engine
        .update_item(item, "Castello Drago".into(), dec("999.00"), true)
        .await
        .unwrap();
    let stored = engine.get_reservation(req.id).await.unwrap();
    assert_eq!(stored.unit_rate, dec("100.00"));
    assert_eq!(stored.final_price, dec("300.00"));
    assert_eq!(stored.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn create_with_promo_applies_discount() {
    let (engine, item) = engine_with_item("create_promo.wal", "100.00").await;
    seed_promo(&engine, "FESTA20", 20).await;

    let created = engine
        .create_reservation(request(item, Some("festa20")), today())
        .await
        .unwrap();
    assert_eq!(created.discount_percent, 20);
    assert_eq!(created.final_price, dec("240.00"));
    assert!(!created.applied_voucher);
}

#[tokio::test]
async fn create_with_unknown_code_aborts() {
    let (engine, item) = engine_with_item("create_bad_code.wal", "100.00").await;
    let result = engine
        .create_reservation(request(item, Some("NOPE")), today())
        .await;
    assert!(matches!(
        result,
        Err(EngineError::InvalidDiscount(RejectReason::NotFound))
    ));
}

#[tokio::test]
async fn create_with_inactive_promo_aborts() {
    let (engine, item) = engine_with_item("create_inactive_promo.wal", "100.00").await;
    engine
        .create_promo("SPENTO".into(), 15, None, None, false)
        .await
        .unwrap();
    let result = engine
        .create_reservation(request(item, Some("SPENTO")), today())
        .await;
    assert!(matches!(
        result,
        Err(EngineError::InvalidDiscount(RejectReason::Inactive))
    ));
}

#[tokio::test]
async fn create_with_blank_code_means_no_discount() {
    let (engine, item) = engine_with_item("create_blank_code.wal", "100.00").await;
    let created = engine
        .create_reservation(request(item, Some("   ")), today())
        .await
        .unwrap();
    assert_eq!(created.discount_percent, 0);
    let stored = engine.get_reservation(created.id).await.unwrap();
    assert_eq!(stored.discount_code, None);
}

#[tokio::test]
async fn create_rejects_past_dates() {
    let (engine, item) = engine_with_item("create_past.wal", "100.00").await;
    let mut req = request(item, None);
    req.range = DayRange::new(d(2024, 5, 28), d(2024, 5, 30));
    let result = engine.create_reservation(req, today()).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn create_starting_today_is_fine() {
    let (engine, item) = engine_with_item("create_today.wal", "100.00").await;
    let mut req = request(item, None);
    req.range = range(1, 2);
    assert!(engine.create_reservation(req, today()).await.is_ok());
}

#[tokio::test]
async fn create_unknown_or_inactive_item_not_found() {
    let (engine, item) = engine_with_item("create_no_item.wal", "100.00").await;

    let mut req = request(Ulid::new(), None);
    req.range = range(10, 12);
    assert!(matches!(
        engine.create_reservation(req, today()).await,
        Err(EngineError::NotFound(_))
    ));

    // Deactivated items are invisible to creation.
    engine
        .update_item(item, "Castello Drago".into(), dec("100.00"), false)
        .await
        .unwrap();
    assert!(matches!(
        engine.create_reservation(request(item, None), today()).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn payment_status_derived_from_method() {
    let (engine, item) = engine_with_item("payment_derive.wal", "100.00").await;

    let mut card = request(item, None);
    card.payment_method = PaymentMethod::CreditCard;
    let created = engine.create_reservation(card, today()).await.unwrap();
    assert_eq!(created.payment_status, PaymentStatus::Paid);

    let mut cash = request(item, None);
    cash.range = range(20, 22);
    let created = engine.create_reservation(cash, today()).await.unwrap();
    assert_eq!(created.payment_status, PaymentStatus::Unpaid);
}

#[tokio::test]
async fn mark_paid_flips_cash_reservations() {
    let (engine, item) = engine_with_item("mark_paid.wal", "100.00").await;
    let created = engine
        .create_reservation(request(item, None), today())
        .await
        .unwrap();
    assert_eq!(created.payment_status, PaymentStatus::Unpaid);

    engine.mark_paid(created.id).await.unwrap();
    let stored = engine.get_reservation(created.id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);

    // Idempotent.
    engine.mark_paid(created.id).await.unwrap();
    assert!(matches!(
        engine.mark_paid(Ulid::new()).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn duplicate_reservation_id_rejected() {
    let (engine, item) = engine_with_item("dup_reservation.wal", "100.00").await;
    let req = request(item, None);
    engine.create_reservation(req.clone(), today()).await.unwrap();

    let mut retry = req;
    retry.range = range(20, 21);
    assert!(matches!(
        engine.create_reservation(retry, today()).await,
        Err(EngineError::AlreadyExists(_))
    ));
}

// ── Availability under contention ────────────────────────

#[tokio::test]
async fn overlapping_create_rejected() {
    let (engine, item) = engine_with_item("overlap_reject.wal", "100.00").await;
    engine
        .create_reservation(request(item, None), today())
        .await
        .unwrap();

    // Sharing the boundary day still conflicts (inclusive ranges).
    let mut overlapping = request(item, None);
    overlapping.range = range(12, 14);
    assert!(matches!(
        engine.create_reservation(overlapping, today()).await,
        Err(EngineError::Unavailable { .. })
    ));

    let mut adjacent = request(item, None);
    adjacent.range = range(13, 15);
    assert!(engine.create_reservation(adjacent, today()).await.is_ok());
}

#[tokio::test]
async fn cancelled_reservation_frees_the_slot() {
    let (engine, item) = engine_with_item("cancel_frees.wal", "100.00").await;
    let req = request(item, None);
    let customer = req.customer_id;
    engine.create_reservation(req.clone(), today()).await.unwrap();

    assert!(matches!(
        engine.create_reservation(request(item, None), today()).await,
        Err(EngineError::Unavailable { .. })
    ));

    engine
        .cancel_reservation(customer, req.id, today())
        .await
        .unwrap();
    assert!(engine.create_reservation(request(item, None), today()).await.is_ok());
}

#[tokio::test]
async fn concurrent_creates_one_winner() {
    let (engine, item) = engine_with_item("concurrent_create.wal", "100.00").await;
    let engine = Arc::new(engine);

    let (a, b) = tokio::join!(
        engine.create_reservation(request(item, None), today()),
        engine.create_reservation(request(item, None), today()),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one overlapping create may win");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(EngineError::Unavailable { .. })));
}

// ── Voucher consumption ──────────────────────────────────

#[tokio::test]
async fn voucher_single_use_end_to_end() {
    let (engine, item) = engine_with_item("voucher_single_use.wal", "100.00").await;
    let customer = Ulid::new();

    // Two completed rentals earn one voucher.
    finish_one(&engine, customer, item, 2, 3).await;
    finish_one(&engine, customer, item, 4, 5).await;

    let vouchers = engine.list_vouchers(customer).await;
    assert_eq!(vouchers.len(), 1);
    let voucher = &vouchers[0];
    assert_eq!(voucher.status, VoucherStatus::Available);
    assert_eq!(voucher.discount_percent, REWARD_DISCOUNT_PERCENT);
    assert!(voucher.code.starts_with(VOUCHER_PREFIX));

    // Spend it.
    let mut req = request(item, Some(voucher.code.as_str()));
    req.customer_id = customer;
    req.range = range(10, 12);
    let created = engine.create_reservation(req, today()).await.unwrap();
    assert!(created.applied_voucher);
    assert_eq!(created.discount_percent, 10);
    assert_eq!(created.final_price, dec("270.00"));

    let spent = &engine.list_vouchers(customer).await[0];
    assert_eq!(spent.status, VoucherStatus::Used);
    assert_eq!(spent.used_reservation_id, Some(created.id));

    // A second spend fails with the retryable conflict, not a silent zero.
    let mut again = request(item, Some(voucher.code.as_str()));
    again.customer_id = customer;
    again.range = range(20, 21);
    assert!(matches!(
        engine.create_reservation(again, today()).await,
        Err(EngineError::DiscountAlreadyUsed(_))
    ));

    // The read-side probe reports a plain rejection.
    assert_eq!(
        engine
            .resolve_discount(Some(customer), &voucher.code, today())
            .await,
        Resolution::Rejected(RejectReason::NotFound)
    );
}

#[tokio::test]
async fn concurrent_voucher_race_single_consumption() {
    let (engine, item_a) = engine_with_item("voucher_race.wal", "100.00").await;
    let item_b = Ulid::new();
    engine
        .create_item(item_b, "Percorso Avventura".into(), dec("80.00"), true)
        .await
        .unwrap();

    let customer = Ulid::new();
    finish_one(&engine, customer, item_a, 2, 3).await;
    finish_one(&engine, customer, item_a, 4, 5).await;
    let code = engine.list_vouchers(customer).await[0].code.clone();

    // Two different items, no date conflict — only the voucher is contended.
    let mut left = request(item_a, Some(code.as_str()));
    left.customer_id = customer;
    left.range = range(10, 11);
    let mut right = request(item_b, Some(code.as_str()));
    right.customer_id = customer;
    right.range = range(10, 11);

    let engine = Arc::new(engine);
    let (a, b) = tokio::join!(
        engine.create_reservation(left, today()),
        engine.create_reservation(right, today()),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "a voucher is consumed exactly once");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(EngineError::DiscountAlreadyUsed(_))));

    // Exactly one reservation references the voucher.
    let spent = &engine.list_vouchers(customer).await[0];
    assert_eq!(spent.status, VoucherStatus::Used);
    assert!(spent.used_reservation_id.is_some());
}

#[tokio::test]
async fn quote_never_consumes() {
    let (engine, item) = engine_with_item("quote_no_consume.wal", "100.00").await;
    let customer = Ulid::new();
    finish_one(&engine, customer, item, 2, 3).await;
    finish_one(&engine, customer, item, 4, 5).await;
    let code = engine.list_vouchers(customer).await[0].code.clone();

    for _ in 0..3 {
        let quote = engine
            .quote(item, range(10, 12), Some(customer), Some(code.as_str()), today())
            .await
            .unwrap();
        assert_eq!(quote.discount_percent, 10);
        assert_eq!(quote.total, dec("270.00"));
    }
    assert_eq!(
        engine.list_vouchers(customer).await[0].status,
        VoucherStatus::Available
    );
}

#[tokio::test]
async fn voucher_of_another_customer_unusable() {
    let (engine, item) = engine_with_item("voucher_wrong_owner.wal", "100.00").await;
    let owner = Ulid::new();
    finish_one(&engine, owner, item, 2, 3).await;
    finish_one(&engine, owner, item, 4, 5).await;
    let code = engine.list_vouchers(owner).await[0].code.clone();

    // Different customer presenting the owner's code: plain not_found.
    let thief = request(item, Some(code.as_str()));
    assert!(matches!(
        engine.create_reservation(thief, today()).await,
        Err(EngineError::InvalidDiscount(RejectReason::NotFound))
    ));
    // And the voucher is untouched.
    assert_eq!(
        engine.list_vouchers(owner).await[0].status,
        VoucherStatus::Available
    );
}

// ── Manual transitions ───────────────────────────────────

#[tokio::test]
async fn transition_table_enforced() {
    let (engine, item) = engine_with_item("transition_table.wal", "100.00").await;
    let created = engine
        .create_reservation(request(item, None), today())
        .await
        .unwrap();
    let id = created.id;

    // pending -> finished is illegal and leaves the status alone.
    let result = engine
        .admin_transition(id, ReservationStatus::Finished, today())
        .await;
    assert!(matches!(result, Err(EngineError::IllegalTransition { .. })));
    assert_eq!(
        engine.get_reservation(id).await.unwrap().status,
        ReservationStatus::Pending
    );

    // pending -> cancelled is an admin no-go too; cancel is customer-side.
    assert!(matches!(
        engine
            .admin_transition(id, ReservationStatus::Cancelled, today())
            .await,
        Err(EngineError::IllegalTransition { .. })
    ));

    engine
        .admin_transition(id, ReservationStatus::Confirmed, today())
        .await
        .unwrap();

    // confirmed -> rejected is illegal.
    assert!(matches!(
        engine
            .admin_transition(id, ReservationStatus::Rejected, today())
            .await,
        Err(EngineError::IllegalTransition { .. })
    ));

    // confirmed -> finished needs the rental to have started.
    assert!(matches!(
        engine
            .admin_transition(id, ReservationStatus::Finished, d(2024, 6, 9))
            .await,
        Err(EngineError::IllegalTransition { .. })
    ));
    engine
        .admin_transition(id, ReservationStatus::Finished, d(2024, 6, 10))
        .await
        .unwrap();

    // finished is terminal.
    assert!(matches!(
        engine
            .admin_transition(id, ReservationStatus::Confirmed, today())
            .await,
        Err(EngineError::IllegalTransition { .. })
    ));
}

#[tokio::test]
async fn admin_cancel_window() {
    let (engine, item) = engine_with_item("admin_cancel_window.wal", "100.00").await;

    // Not yet started: cancellable.
    let created = engine
        .create_reservation(request(item, None), today())
        .await
        .unwrap();
    engine
        .admin_transition(created.id, ReservationStatus::Confirmed, today())
        .await
        .unwrap();
    engine
        .admin_transition(created.id, ReservationStatus::Cancelled, d(2024, 6, 9))
        .await
        .unwrap();

    // Already started: not cancellable.
    let mut second = request(item, None);
    second.range = range(10, 12);
    let second = engine.create_reservation(second, today()).await.unwrap();
    engine
        .admin_transition(second.id, ReservationStatus::Confirmed, today())
        .await
        .unwrap();
    assert!(matches!(
        engine
            .admin_transition(second.id, ReservationStatus::Cancelled, d(2024, 6, 10))
            .await,
        Err(EngineError::IllegalTransition { .. })
    ));
}

#[tokio::test]
async fn reject_releases_availability() {
    let (engine, item) = engine_with_item("reject_releases.wal", "100.00").await;
    let created = engine
        .create_reservation(request(item, None), today())
        .await
        .unwrap();
    engine
        .admin_transition(created.id, ReservationStatus::Rejected, today())
        .await
        .unwrap();
    assert!(engine.create_reservation(request(item, None), today()).await.is_ok());
}

#[tokio::test]
async fn customer_cancel_rules() {
    let (engine, item) = engine_with_item("customer_cancel.wal", "100.00").await;
    let req = request(item, None);
    let customer = req.customer_id;
    let id = req.id;
    engine.create_reservation(req, today()).await.unwrap();

    // Someone else's id: reads as not_found, nothing leaks.
    assert!(matches!(
        engine.cancel_reservation(Ulid::new(), id, today()).await,
        Err(EngineError::NotFound(_))
    ));

    engine.cancel_reservation(customer, id, today()).await.unwrap();
    assert_eq!(
        engine.get_reservation(id).await.unwrap().status,
        ReservationStatus::Cancelled
    );
    // Cancelling twice is a quiet no-op.
    engine.cancel_reservation(customer, id, today()).await.unwrap();
}

#[tokio::test]
async fn customer_cannot_cancel_started_confirmed() {
    let (engine, item) = engine_with_item("cancel_started.wal", "100.00").await;
    let req = request(item, None);
    let customer = req.customer_id;
    let id = req.id;
    engine.create_reservation(req, today()).await.unwrap();
    engine
        .admin_transition(id, ReservationStatus::Confirmed, today())
        .await
        .unwrap();

    // date_from is the 10th: on the 10th it is too late.
    assert!(matches!(
        engine.cancel_reservation(customer, id, d(2024, 6, 10)).await,
        Err(EngineError::IllegalTransition { .. })
    ));
    // The day before it still works.
    engine
        .cancel_reservation(customer, id, d(2024, 6, 9))
        .await
        .unwrap();
}

#[tokio::test]
async fn customer_cannot_cancel_finished_or_rejected() {
    let (engine, item) = engine_with_item("cancel_terminal.wal", "100.00").await;

    let req = request(item, None);
    let customer = req.customer_id;
    let id = req.id;
    engine.create_reservation(req, today()).await.unwrap();
    engine
        .admin_transition(id, ReservationStatus::Rejected, today())
        .await
        .unwrap();
    assert!(matches!(
        engine.cancel_reservation(customer, id, today()).await,
        Err(EngineError::IllegalTransition { .. })
    ));
}

// ── Loyalty cadence ──────────────────────────────────────

#[tokio::test]
async fn reward_cadence_floor_of_half() {
    let (engine, item) = engine_with_item("cadence.wal", "100.00").await;
    let customer = Ulid::new();

    finish_one(&engine, customer, item, 2, 2).await;
    assert_eq!(engine.list_vouchers(customer).await.len(), 0);

    finish_one(&engine, customer, item, 3, 3).await;
    assert_eq!(engine.list_vouchers(customer).await.len(), 1);

    finish_one(&engine, customer, item, 4, 4).await;
    assert_eq!(engine.list_vouchers(customer).await.len(), 1);

    finish_one(&engine, customer, item, 5, 5).await;
    assert_eq!(engine.list_vouchers(customer).await.len(), 2);

    // Idempotent top-up: nothing new without new completions.
    let issued = engine.ensure_vouchers_issued(customer).await.unwrap();
    assert!(issued.is_empty());
    assert_eq!(engine.list_vouchers(customer).await.len(), 2);
}

#[tokio::test]
async fn top_up_covers_missed_issuance() {
    // Four finished rentals on file and zero vouchers ever issued (journal
    // written by an older build, say): the next top-up call issues exactly
    // the two owed, and a second call issues nothing.
    let path = test_wal_path("top_up.wal");
    let customer = Ulid::new();
    let item = Ulid::new();
    {
        let mut wal = crate::wal::Wal::open(&path).unwrap();
        wal.append(&Event::ItemCreated {
            id: item,
            name: "Castello Drago".into(),
            daily_rate: dec("100.00"),
            active: true,
        })
        .unwrap();
        for day in [2u32, 4, 6, 8] {
            let id = Ulid::new();
            wal.append(&Event::ReservationCreated {
                id,
                customer_id: customer,
                item_id: item,
                range: range(day, day),
                unit_rate: dec("100.00"),
                discount_percent: 0,
                final_price: dec("100.00"),
                discount_code: None,
                voucher_code: None,
                shipping_ref: "Via Roma 1, Torino (10121)".into(),
                payment_method: PaymentMethod::CreditCard,
                payment_status: PaymentStatus::Paid,
                at: chrono::Utc::now(),
            })
            .unwrap();
            wal.append(&Event::ReservationStatusChanged {
                id,
                to: ReservationStatus::Finished,
                at: chrono::Utc::now(),
            })
            .unwrap();
        }
    }

    let engine = Engine::new(path).unwrap();
    assert!(engine.list_vouchers(customer).await.is_empty());

    let issued = engine.ensure_vouchers_issued(customer).await.unwrap();
    assert_eq!(issued.len(), 2);
    assert!(issued.iter().all(|v| v.status == VoucherStatus::Available));

    let again = engine.ensure_vouchers_issued(customer).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(engine.list_vouchers(customer).await.len(), 2);
}

#[tokio::test]
async fn loyalty_summary_shape() {
    let (engine, item) = engine_with_item("summary.wal", "100.00").await;
    let customer = Ulid::new();

    let summary = engine.loyalty_summary(customer).await;
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.available, 0);
    assert_eq!(summary.remaining_to_next, 2);

    finish_one(&engine, customer, item, 2, 2).await;
    let summary = engine.loyalty_summary(customer).await;
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.progress_in_cycle, 1);
    assert_eq!(summary.remaining_to_next, 1);

    finish_one(&engine, customer, item, 3, 3).await;
    let summary = engine.loyalty_summary(customer).await;
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.earned, 1);
    assert_eq!(summary.available, 1);
    assert_eq!(summary.used, 0);
    assert_eq!(summary.progress_in_cycle, 0);
    // A voucher is waiting, so nothing is "remaining".
    assert_eq!(summary.remaining_to_next, 0);
    assert_eq!(summary.discount_percent, REWARD_DISCOUNT_PERCENT);
}

#[tokio::test]
async fn cancelled_rentals_earn_nothing() {
    let (engine, item) = engine_with_item("no_credit.wal", "100.00").await;
    let req = request(item, None);
    let customer = req.customer_id;
    engine.create_reservation(req.clone(), today()).await.unwrap();
    engine
        .cancel_reservation(customer, req.id, today())
        .await
        .unwrap();

    let summary = engine.loyalty_summary(customer).await;
    assert_eq!(summary.completed, 0);
    assert!(engine.list_vouchers(customer).await.is_empty());
}

// ── Sweep ────────────────────────────────────────────────

#[tokio::test]
async fn sweep_advances_both_kinds_and_issues_vouchers() {
    let (engine, item) = engine_with_item("sweep_both.wal", "100.00").await;
    let customer = Ulid::new();

    // One pending, two confirmed, all ending by June 8th.
    let mut stale_pending = request(item, None);
    stale_pending.range = range(2, 3);
    let stale_pending = engine.create_reservation(stale_pending, today()).await.unwrap();

    let mut confirmed_a = request(item, None);
    confirmed_a.customer_id = customer;
    confirmed_a.range = range(4, 5);
    let confirmed_a = engine.create_reservation(confirmed_a, today()).await.unwrap();
    engine
        .admin_transition(confirmed_a.id, ReservationStatus::Confirmed, today())
        .await
        .unwrap();

    let mut confirmed_b = request(item, None);
    confirmed_b.customer_id = customer;
    confirmed_b.range = range(6, 7);
    let confirmed_b = engine.create_reservation(confirmed_b, today()).await.unwrap();
    engine
        .admin_transition(confirmed_b.id, ReservationStatus::Confirmed, today())
        .await
        .unwrap();

    // One still in the future stays untouched.
    let mut future = request(item, None);
    future.range = range(20, 22);
    let future = engine.create_reservation(future, today()).await.unwrap();

    let outcome = engine.sweep(d(2024, 6, 8)).await;
    assert_eq!(outcome.cancelled, 1);
    assert_eq!(outcome.finished, 2);
    assert_eq!(outcome.vouchers_issued, 1); // two finishes → one voucher

    assert_eq!(
        engine.get_reservation(stale_pending.id).await.unwrap().status,
        ReservationStatus::Cancelled
    );
    assert_eq!(
        engine.get_reservation(confirmed_b.id).await.unwrap().status,
        ReservationStatus::Finished
    );
    assert_eq!(
        engine.get_reservation(future.id).await.unwrap().status,
        ReservationStatus::Pending
    );

    // Running it again changes nothing.
    let again = engine.sweep(d(2024, 6, 8)).await;
    assert_eq!(again, SweepOutcome::default());
}

#[tokio::test]
async fn sweep_waits_for_end_date_to_pass() {
    let (engine, item) = engine_with_item("sweep_not_yet.wal", "100.00").await;
    let created = engine
        .create_reservation(request(item, None), today())
        .await
        .unwrap();

    // On the final rental day the reservation still stands.
    let outcome = engine.sweep(d(2024, 6, 12)).await;
    assert_eq!(outcome, SweepOutcome::default());
    assert_eq!(
        engine.get_reservation(created.id).await.unwrap().status,
        ReservationStatus::Pending
    );
}

// ── Durability ───────────────────────────────────────────

#[tokio::test]
async fn state_survives_restart() {
    let path = test_wal_path("restart.wal");
    let item = Ulid::new();
    let customer = Ulid::new();
    let reservation_id;
    let voucher_code;

    {
        let engine = Engine::new(path.clone()).unwrap();
        engine
            .create_item(item, "Castello Drago".into(), dec("100.00"), true)
            .await
            .unwrap();
        seed_promo(&engine, "FESTA20", 20).await;
        finish_one(&engine, customer, item, 2, 3).await;
        finish_one(&engine, customer, item, 4, 5).await;
        voucher_code = engine.list_vouchers(customer).await[0].code.clone();

        let mut req = request(item, Some(voucher_code.as_str()));
        req.customer_id = customer;
        let created = engine.create_reservation(req, today()).await.unwrap();
        reservation_id = created.id;
    }

    let engine = Engine::new(path).unwrap();
    let stored = engine.get_reservation(reservation_id).await.unwrap();
    assert_eq!(stored.discount_percent, 10);
    assert_eq!(stored.final_price, dec("270.00"));
    assert_eq!(stored.discount_code.as_deref(), Some(voucher_code.as_str()));

    // The voucher is still consumed after replay — no double-spend window.
    let voucher = &engine.list_vouchers(customer).await[0];
    assert_eq!(voucher.status, VoucherStatus::Used);
    assert_eq!(voucher.used_reservation_id, Some(reservation_id));

    // The promo survived too.
    assert!(matches!(
        engine.resolve_discount(None, "FESTA20", today()).await,
        Resolution::Applied(_)
    ));

    // And the slot is still taken.
    assert!(matches!(
        engine.create_reservation(request(item, None), today()).await,
        Err(EngineError::Unavailable { .. })
    ));
}

#[tokio::test]
async fn compaction_preserves_state() {
    let path = test_wal_path("compact_state.wal");
    let item = Ulid::new();
    let customer = Ulid::new();

    {
        let engine = Engine::new(path.clone()).unwrap();
        engine
            .create_item(item, "Castello Drago".into(), dec("100.00"), true)
            .await
            .unwrap();
        finish_one(&engine, customer, item, 2, 3).await;
        finish_one(&engine, customer, item, 4, 5).await;
        let code = engine.list_vouchers(customer).await[0].code.clone();
        let mut req = request(item, Some(code.as_str()));
        req.customer_id = customer;
        engine.create_reservation(req, today()).await.unwrap();

        engine.compact_wal().await.unwrap();
        assert_eq!(engine.wal_appends_since_compact().await, 0);
    }

    let engine = Engine::new(path).unwrap();
    let summary = engine.loyalty_summary(customer).await;
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.available, 0); // the voucher stayed spent
    let vouchers = engine.list_vouchers(customer).await;
    assert_eq!(vouchers.len(), 1);
    assert_eq!(vouchers[0].status, VoucherStatus::Used);

    // Finished history is intact, so no duplicate voucher gets issued.
    let issued = engine.ensure_vouchers_issued(customer).await.unwrap();
    assert!(issued.is_empty());
}

// ── Listing & quoting ────────────────────────────────────

#[tokio::test]
async fn listing_filters() {
    let (engine, item) = engine_with_item("listing.wal", "100.00").await;
    let other_item = Ulid::new();
    engine
        .create_item(other_item, "Percorso Avventura".into(), dec("80.00"), true)
        .await
        .unwrap();
    seed_promo(&engine, "FESTA20", 20).await;

    let mut on_item = request(item, Some("FESTA20"));
    on_item.range = range(10, 12);
    let on_item = engine.create_reservation(on_item, today()).await.unwrap();

    let mut on_other = request(other_item, None);
    on_other.range = range(10, 12);
    engine.create_reservation(on_other, today()).await.unwrap();

    let all = engine.list_reservations(&ReservationFilter::default()).await;
    assert_eq!(all.len(), 2);

    let by_item = engine
        .list_reservations(&ReservationFilter {
            item_id: Some(item),
            ..Default::default()
        })
        .await;
    assert_eq!(by_item.len(), 1);
    assert_eq!(by_item[0].reservation.id, on_item.id);
    assert_eq!(by_item[0].item_name, "Castello Drago");

    let by_status = engine
        .list_reservations(&ReservationFilter {
            status: Some(ReservationStatus::Confirmed),
            ..Default::default()
        })
        .await;
    assert!(by_status.is_empty());

    // Text search hits item names and discount codes, case-insensitively.
    let by_text = engine
        .list_reservations(&ReservationFilter {
            text: Some("avventura".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(by_text.len(), 1);
    let by_code = engine
        .list_reservations(&ReservationFilter {
            text: Some("festa".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(by_code.len(), 1);
    assert_eq!(by_code[0].reservation.id, on_item.id);

    let by_window = engine
        .list_reservations(&ReservationFilter {
            from: Some(d(2024, 6, 11)),
            ..Default::default()
        })
        .await;
    assert!(by_window.is_empty());
}

#[tokio::test]
async fn quote_matches_create_and_stays_lenient() {
    let (engine, item) = engine_with_item("quote_lenient.wal", "100.00").await;
    seed_promo(&engine, "FESTA20", 20).await;

    let quoted = engine
        .quote(item, range(10, 12), None, Some("FESTA20"), today())
        .await
        .unwrap();
    assert_eq!(quoted.days, 3);
    assert_eq!(quoted.subtotal, dec("300.00"));
    assert_eq!(quoted.discount_amount, dec("60.00"));
    assert_eq!(quoted.total, dec("240.00"));

    // Unknown code on the preview path quotes at 0% instead of failing.
    let lenient = engine
        .quote(item, range(10, 12), None, Some("NOPE"), today())
        .await
        .unwrap();
    assert_eq!(lenient.discount_percent, 0);
    assert_eq!(lenient.total, dec("300.00"));

    assert!(matches!(
        engine.quote(Ulid::new(), range(10, 12), None, None, today()).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn availability_probe_matches_create_rule() {
    let (engine, item) = engine_with_item("probe.wal", "100.00").await;
    let created = engine
        .create_reservation(request(item, None), today())
        .await
        .unwrap();

    assert!(!engine.is_available(item, range(11, 13), None).await.unwrap());
    assert!(engine.is_available(item, range(13, 14), None).await.unwrap());
    // Self-exclusion for re-validation.
    assert!(
        engine
            .is_available(item, range(10, 12), Some(created.id))
            .await
            .unwrap()
    );
    assert!(matches!(
        engine.is_available(Ulid::new(), range(10, 12), None).await,
        Err(EngineError::NotFound(_))
    ));
}

// ── Promo administration ─────────────────────────────────

#[tokio::test]
async fn promo_codes_unique_and_prefix_reserved() {
    let (engine, _) = engine_with_item("promo_admin.wal", "100.00").await;
    seed_promo(&engine, "FESTA20", 20).await;

    assert!(matches!(
        engine.create_promo("festa20".into(), 10, None, None, true).await,
        Err(EngineError::AlreadyExists(_))
    ));
    assert!(matches!(
        engine
            .create_promo("LCH-FAKE01".into(), 10, None, None, true)
            .await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine
            .create_promo("BACKWARDS".into(), 10, Some(d(2024, 7, 1)), Some(d(2024, 6, 1)), true)
            .await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.update_promo("GHOST".into(), 10, None, None, true).await,
        Err(EngineError::CodeNotFound(_))
    ));

    // Deactivation takes effect at the next resolution.
    engine
        .update_promo("FESTA20".into(), 20, None, None, false)
        .await
        .unwrap();
    assert_eq!(
        engine.resolve_discount(None, "FESTA20", today()).await,
        Resolution::Rejected(RejectReason::Inactive)
    );
}
