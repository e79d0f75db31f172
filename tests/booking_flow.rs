//! End-to-end booking flow tests against the in-memory store, with
//! deterministic payment and notification doubles.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use ticket_core::catalog::EventUpdate;
use ticket_core::error::CoreError;
use ticket_core::models::{
    decode_confirmation_token, Booking, DynamicPricing, Event, PaymentStatus, PricingRule, User,
};
use ticket_core::services::BookingNotification;
use ticket_core::{
    BookingCore, Config, CoreResult, LogNotifier, MemoryStore, Notifier, PaymentGateway,
};
use uuid::Uuid;

struct FixedGateway(bool);

#[async_trait]
impl PaymentGateway for FixedGateway {
    async fn charge(&self, _booking: &Booking) -> CoreResult<bool> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct CountingNotifier {
    calls: AtomicUsize,
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify_booking_confirmed(&self, _n: &BookingNotification) -> CoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify_booking_confirmed(&self, _n: &BookingNotification) -> CoreResult<()> {
        Err(CoreError::transient(std::io::Error::other("smtp down")))
    }
}

fn core_with(gateway: Arc<dyn PaymentGateway>, notifier: Arc<dyn Notifier>) -> BookingCore {
    BookingCore::new(Arc::new(MemoryStore::new()), gateway, notifier, Config::default())
}

fn core() -> BookingCore {
    core_with(Arc::new(FixedGateway(true)), Arc::new(LogNotifier))
}

fn test_event(total: i32, sold: i32, base: f64, rules: Vec<(i32, f64)>) -> Event {
    Event {
        id: Uuid::new_v4(),
        name: "Rust Philharmonic".into(),
        description: "an evening of borrow checking".into(),
        date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
        time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        venue: "Main Hall".into(),
        category: "music".into(),
        total_seats: total,
        base_price: base,
        pricing: DynamicPricing {
            enabled: !rules.is_empty(),
            rules: rules
                .into_iter()
                .map(|(threshold, percentage)| PricingRule {
                    threshold,
                    percentage,
                    description: None,
                })
                .collect(),
        },
        sold_tickets: sold,
        revenue: sold as f64 * base,
        organizer_id: Uuid::new_v4(),
        created_at: Utc::now(),
    }
}

async fn seed_event(core: &BookingCore, event: &Event) {
    core.store.insert_event(event).await.unwrap();
}

async fn seed_user(core: &BookingCore) -> User {
    let user = User::new("Ada", "ada@example.com");
    core.store.insert_user(&user).await.unwrap();
    user
}

// === single booking ===

#[tokio::test]
async fn single_booking_freezes_dynamic_price_and_updates_counters() {
    let core = core();
    // 2 seats left, rule threshold 3 at +20% => price 120.00
    let event = test_event(10, 8, 100.0, vec![(3, 20.0)]);
    seed_event(&core, &event).await;
    let user_id = Uuid::new_v4();

    let booking = core.engine.book_single(event.id, user_id, "A9").await.unwrap();
    assert_eq!(booking.ticket_price, 120.0);
    assert_eq!(booking.seat_number, "A9");
    assert_eq!(booking.payment_status, PaymentStatus::Pending);

    let stored = core.store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.sold_tickets, 9);
    // revenue follows the base price, not the dynamic one
    assert_eq!(stored.revenue, 900.0);
}

#[tokio::test]
async fn booking_unknown_event_fails() {
    let core = core();
    let result = core.engine.book_single(Uuid::new_v4(), Uuid::new_v4(), "A1").await;
    assert!(matches!(result, Err(CoreError::EventNotFound)));
}

#[tokio::test]
async fn second_booking_of_same_seat_conflicts() {
    let core = core();
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;

    core.engine.book_single(event.id, Uuid::new_v4(), "A1").await.unwrap();
    match core.engine.book_single(event.id, Uuid::new_v4(), "A1").await {
        Err(CoreError::SeatConflict(seats)) => assert_eq!(seats, vec!["A1".to_string()]),
        other => panic!("expected SeatConflict, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn booking_full_event_is_sold_out() {
    let core = core();
    let event = test_event(1, 0, 50.0, vec![]);
    seed_event(&core, &event).await;

    core.engine.book_single(event.id, Uuid::new_v4(), "A1").await.unwrap();
    let result = core.engine.book_single(event.id, Uuid::new_v4(), "B1").await;
    assert!(matches!(result, Err(CoreError::SoldOut)));
}

#[tokio::test]
async fn confirmation_token_decodes_to_booking_identity() {
    let core = core();
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;
    let user_id = Uuid::new_v4();

    let booking = core.engine.book_single(event.id, user_id, "C3").await.unwrap();
    let payload = decode_confirmation_token(&booking.confirmation_token).unwrap();
    assert_eq!(payload.booking_id, booking.id);
    assert_eq!(payload.event_id, event.id);
    assert_eq!(payload.user_id, user_id);
    assert_eq!(payload.seat_number, "C3");
}

// === bulk booking ===

#[tokio::test]
async fn bulk_booking_shares_one_price_snapshot() {
    let core = core();
    // 3 seats left, threshold 3 => every seat in the batch costs 120
    let event = test_event(10, 7, 100.0, vec![(3, 20.0)]);
    seed_event(&core, &event).await;

    let seats = vec!["A8".to_string(), "A9".to_string(), "A10".to_string()];
    let bookings = core
        .engine
        .book_bulk(event.id, Uuid::new_v4(), seats)
        .await
        .unwrap();

    assert_eq!(bookings.len(), 3);
    for booking in &bookings {
        assert_eq!(booking.ticket_price, 120.0);
    }
    let stored = core.store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.sold_tickets, 10);
}

#[tokio::test]
async fn bulk_booking_over_capacity_creates_nothing() {
    let core = core();
    let event = test_event(10, 8, 100.0, vec![]);
    seed_event(&core, &event).await;
    let user_id = Uuid::new_v4();

    let seats = vec!["A1".to_string(), "A2".to_string(), "A3".to_string()];
    let result = core.engine.book_bulk(event.id, user_id, seats).await;
    assert!(matches!(result, Err(CoreError::SoldOut)));

    // all-or-nothing: no partial bookings, counter untouched
    assert!(core.engine.user_bookings(user_id).await.unwrap().is_empty());
    let stored = core.store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.sold_tickets, 8);
}

#[tokio::test]
async fn bulk_booking_reports_every_conflicting_seat() {
    let core = core();
    let event = test_event(20, 0, 50.0, vec![]);
    seed_event(&core, &event).await;
    let user_id = Uuid::new_v4();

    core.engine
        .book_bulk(
            event.id,
            Uuid::new_v4(),
            vec!["A1".to_string(), "A3".to_string()],
        )
        .await
        .unwrap();

    let batch = vec![
        "A1".to_string(),
        "A2".to_string(),
        "A3".to_string(),
        "A4".to_string(),
    ];
    match core.engine.book_bulk(event.id, user_id, batch).await {
        Err(CoreError::SeatConflict(seats)) => {
            assert_eq!(seats, vec!["A1".to_string(), "A3".to_string()]);
        }
        other => panic!("expected SeatConflict, got {:?}", other.err()),
    }

    // nothing from the failed batch was persisted
    assert!(core.engine.user_bookings(user_id).await.unwrap().is_empty());
    let stored = core.store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.sold_tickets, 2);
}

#[tokio::test]
async fn bulk_booking_validates_input() {
    let core = core();
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;
    let user_id = Uuid::new_v4();

    let empty: Vec<String> = vec![];
    assert!(matches!(
        core.engine.book_bulk(event.id, user_id, empty).await,
        Err(CoreError::InvalidInput(_))
    ));
    assert!(matches!(
        core.engine
            .book_bulk(event.id, user_id, vec!["A1".into(), "A1".into()])
            .await,
        Err(CoreError::InvalidInput(_))
    ));
    assert!(matches!(
        core.engine.book_single(event.id, user_id, "   ").await,
        Err(CoreError::InvalidInput(_))
    ));
}

// === organizer edits vs sale counters ===

#[tokio::test]
async fn stale_event_update_cannot_roll_back_sale_counters() {
    let core = core();
    let event = test_event(2, 0, 50.0, vec![]);
    seed_event(&core, &event).await;

    // snapshot taken before the sale, the way an editor form would
    let mut stale = core.store.get_event(event.id).await.unwrap().unwrap();

    core.engine.book_single(event.id, Uuid::new_v4(), "A1").await.unwrap();

    stale.name = "Renamed".into();
    core.store.update_event(&stale).await.unwrap();

    let stored = core.store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Renamed");
    assert_eq!(stored.sold_tickets, 1);
    assert_eq!(stored.revenue, 50.0);

    // seat accounting still holds: one seat left on a 2-seat event
    core.engine.book_single(event.id, Uuid::new_v4(), "A2").await.unwrap();
    assert!(matches!(
        core.engine.book_single(event.id, Uuid::new_v4(), "B1").await,
        Err(CoreError::SoldOut)
    ));
}

#[tokio::test]
async fn organizer_edit_keeps_counters_intact() {
    let core = core();
    let event = test_event(10, 0, 50.0, vec![]);
    let organizer_id = event.organizer_id;
    seed_event(&core, &event).await;

    core.engine.book_single(event.id, Uuid::new_v4(), "A1").await.unwrap();

    let update = EventUpdate {
        name: Some("Matinee".into()),
        base_price: Some(60.0),
        ..Default::default()
    };
    core.engine
        .catalog()
        .update_event(event.id, organizer_id, update)
        .await
        .unwrap();

    let stored = core.store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Matinee");
    assert_eq!(stored.base_price, 60.0);
    assert_eq!(stored.sold_tickets, 1);
    assert_eq!(stored.revenue, 50.0);
}

// === concurrency ===

#[tokio::test]
async fn exactly_one_of_n_racing_claims_wins_the_seat() {
    let core = Arc::new(core());
    let event = test_event(50, 0, 50.0, vec![]);
    seed_event(&core, &event).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let core = core.clone();
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            core.engine.book_single(event_id, Uuid::new_v4(), "A1").await
        }));
    }

    let mut won = 0;
    let mut conflicted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(CoreError::SeatConflict(_)) => conflicted += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(conflicted, 9);
    let stored = core.store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.sold_tickets, 1);
}

#[tokio::test]
async fn concurrent_bookings_never_oversell() {
    let core = Arc::new(core());
    let event = test_event(5, 0, 50.0, vec![]);
    seed_event(&core, &event).await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let core = core.clone();
        let event_id = event.id;
        let seat = format!("A{}", i + 1);
        handles.push(tokio::spawn(async move {
            core.engine.book_single(event_id, Uuid::new_v4(), &seat).await
        }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(CoreError::SoldOut) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(won, 5);
    let stored = core.store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.sold_tickets, 5);
    assert!(stored.sold_tickets <= stored.total_seats);
}

#[tokio::test]
async fn bulk_seats_are_trimmed_before_checks() {
    let core = core();
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;

    // the same seat with stray whitespace is a duplicate, not a second seat
    assert!(matches!(
        core.engine
            .book_bulk(event.id, Uuid::new_v4(), vec![" A1".into(), "A1".into()])
            .await,
        Err(CoreError::InvalidInput(_))
    ));

    let booked = core
        .engine
        .book_bulk(event.id, Uuid::new_v4(), vec!["  B2 ".into()])
        .await
        .unwrap();
    assert_eq!(booked[0].seat_number, "B2");
    assert!(matches!(
        core.engine.book_single(event.id, Uuid::new_v4(), "B2").await,
        Err(CoreError::SeatConflict(_))
    ));
}

// === catalog reads ===

#[tokio::test]
async fn upcoming_excludes_events_dated_today() {
    let core = core();
    let today = Utc::now().date_naive();

    let mut today_event = test_event(10, 0, 50.0, vec![]);
    today_event.date = today;
    let mut future_event = test_event(10, 0, 50.0, vec![]);
    future_event.date = today.succ_opt().unwrap();
    seed_event(&core, &today_event).await;
    seed_event(&core, &future_event).await;

    let upcoming = core.engine.catalog().upcoming_events().await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, future_event.id);
}

#[tokio::test]
async fn organizer_listing_is_scoped_and_cached() {
    let core = core();
    let mine = test_event(10, 0, 50.0, vec![]);
    let mut also_mine = test_event(10, 0, 60.0, vec![]);
    also_mine.organizer_id = mine.organizer_id;
    let other = test_event(10, 0, 70.0, vec![]);
    seed_event(&core, &mine).await;
    seed_event(&core, &also_mine).await;
    seed_event(&core, &other).await;

    let listed = core
        .engine
        .catalog()
        .organizer_events(mine.organizer_id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|e| e.organizer_id == mine.organizer_id));

    // the second read is served from the event pool
    let hits_before = core.cache.stats().0.hits;
    core.engine
        .catalog()
        .organizer_events(mine.organizer_id)
        .await
        .unwrap();
    assert!(core.cache.stats().0.hits > hits_before);
}

// === payment settlement ===

#[tokio::test]
async fn settlement_requires_ownership_and_existence() {
    let core = core();
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;
    let user = seed_user(&core).await;

    let booking = core.engine.book_single(event.id, user.id, "A1").await.unwrap();

    assert!(matches!(
        core.engine.settle_payment(booking.id, Uuid::new_v4()).await,
        Err(CoreError::Unauthorized)
    ));
    assert!(matches!(
        core.engine.settle_payment(Uuid::new_v4(), user.id).await,
        Err(CoreError::BookingNotFound)
    ));
}

#[tokio::test]
async fn successful_settlement_completes_and_notifies_once() {
    let notifier = Arc::new(CountingNotifier::default());
    let core = core_with(Arc::new(FixedGateway(true)), notifier.clone());
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;
    let user = seed_user(&core).await;

    let booking = core.engine.book_single(event.id, user.id, "A1").await.unwrap();
    let settled = core.engine.settle_payment(booking.id, user.id).await.unwrap();

    assert_eq!(settled.payment_status, PaymentStatus::Completed);
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);

    let stored = core.store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn declined_settlement_marks_failed_without_notification() {
    let notifier = Arc::new(CountingNotifier::default());
    let core = core_with(Arc::new(FixedGateway(false)), notifier.clone());
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;
    let user = seed_user(&core).await;

    let booking = core.engine.book_single(event.id, user.id, "A1").await.unwrap();
    let settled = core.engine.settle_payment(booking.id, user.id).await.unwrap();

    assert_eq!(settled.payment_status, PaymentStatus::Failed);
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn notification_failure_does_not_roll_back_settlement() {
    let core = core_with(Arc::new(FixedGateway(true)), Arc::new(FailingNotifier));
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;
    let user = seed_user(&core).await;

    let booking = core.engine.book_single(event.id, user.id, "A1").await.unwrap();
    let settled = core.engine.settle_payment(booking.id, user.id).await.unwrap();

    assert_eq!(settled.payment_status, PaymentStatus::Completed);
}

// === cache coherence ===

#[tokio::test]
async fn seat_map_reflects_booking_immediately_after_invalidation() {
    let core = core();
    let event = test_event(10, 8, 100.0, vec![(3, 20.0)]);
    seed_event(&core, &event).await;

    // warm the seat-map cache
    let before = core.engine.seat_map(event.id).await.unwrap();
    let a9 = before.seats.iter().find(|s| s.seat_number == "A9").unwrap();
    assert!(a9.is_available);
    assert_eq!(before.sold_tickets, 8);
    assert_eq!(before.current_price, 120.0);

    core.engine.book_single(event.id, Uuid::new_v4(), "A9").await.unwrap();

    // the mutation invalidated the cached map; the re-read is fresh
    let after = core.engine.seat_map(event.id).await.unwrap();
    let a9 = after.seats.iter().find(|s| s.seat_number == "A9").unwrap();
    assert!(!a9.is_available);
    assert_eq!(after.sold_tickets, 9);
    // one seat left now, the 20% rule still applies
    assert_eq!(after.current_price, 120.0);
}

#[tokio::test]
async fn user_booking_list_is_invalidated_by_booking_and_settlement() {
    let core = core_with(Arc::new(FixedGateway(true)), Arc::new(LogNotifier));
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;
    let user = seed_user(&core).await;

    // warm: empty list cached
    assert!(core.engine.user_bookings(user.id).await.unwrap().is_empty());

    let booking = core.engine.book_single(event.id, user.id, "A1").await.unwrap();
    let listed = core.engine.user_bookings(user.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].payment_status, PaymentStatus::Pending);

    core.engine.settle_payment(booking.id, user.id).await.unwrap();
    let listed = core.engine.user_bookings(user.id).await.unwrap();
    assert_eq!(listed[0].payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn cached_event_reads_are_refreshed_after_mutation() {
    let core = core();
    let event = test_event(10, 0, 50.0, vec![]);
    seed_event(&core, &event).await;

    // warm the event pool
    let cached = core.engine.catalog().event_by_id(event.id).await.unwrap();
    assert_eq!(cached.sold_tickets, 0);

    core.engine.book_single(event.id, Uuid::new_v4(), "A1").await.unwrap();

    let fresh = core.engine.catalog().event_by_id(event.id).await.unwrap();
    assert_eq!(fresh.sold_tickets, 1);
}
