//! Tests for the registration lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rust_decimal::Decimal;

use super::*;
use crate::models::{Event, EventRecord, RegistrationStatus};
use crate::notifications::{DispatchError, MockNotificationDispatcher};
use crate::repository::{MemoryStore, MockEventRepository, MockRegistrationRepository};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

fn actor() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        is_staff: false,
    }
}

fn staff() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        is_staff: true,
    }
}

fn event(capacity: i32, starts_in: Duration) -> Event {
    Event {
        id: Uuid::new_v4(),
        organizer_id: Uuid::new_v4(),
        title: "Compiler night".to_string(),
        description: "Borrow checker deep dive".to_string(),
        location: "Zurich".to_string(),
        start_time: now() + starts_in,
        capacity,
        price: Decimal::new(1000, 2),
        is_active: true,
        created_at: now() - Duration::days(30),
        updated_at: now() - Duration::days(30),
    }
}

fn quiet_notifier() -> MockNotificationDispatcher {
    let mut notifier = MockNotificationDispatcher::new();
    notifier.expect_dispatch().returning(|_| Ok(()));
    notifier
}

fn manager_over(store: &MemoryStore, notifier: MockNotificationDispatcher) -> RegistrationManager {
    let store = Arc::new(store.clone());
    RegistrationManager::new(
        store.clone(),
        store,
        Arc::new(notifier),
        Arc::new(FixedClock(now())),
    )
}

async fn store_with(event: &Event) -> MemoryStore {
    let store = MemoryStore::new();
    EventRepository::create(&store, event.clone())
        .await
        .expect("event stored");
    store
}

#[tokio::test]
async fn test_register_creates_pending_registration_and_queues_notice() {
    let event = event(1, Duration::days(1));
    let store = store_with(&event).await;
    let user = actor();

    let mut notifier = MockNotificationDispatcher::new();
    let expected_event = event.id;
    let expected_user = user.id;
    notifier
        .expect_dispatch()
        .withf(move |notice| {
            notice.event_id == expected_event && notice.user_id == expected_user
        })
        .times(1)
        .returning(|_| Ok(()));
    let manager = manager_over(&store, notifier);

    let registration = manager.register(event.id, &user).await.expect("admitted");

    assert_eq!(registration.status, RegistrationStatus::Pending);
    assert_eq!(registration.payment_status, crate::models::PaymentStatus::Pending);
    assert_eq!(registration.registered_at, now());
}

#[tokio::test]
async fn test_single_seat_goes_to_first_registrant() {
    let event = event(1, Duration::days(1));
    let store = store_with(&event).await;
    let manager = manager_over(&store, quiet_notifier());

    manager.register(event.id, &actor()).await.expect("admitted");
    let second = manager.register(event.id, &actor()).await;

    assert!(matches!(
        second,
        Err(RegistrationError::Ineligible(EligibilityError::NoAvailableSeats))
    ));
}

#[tokio::test]
async fn test_inactive_or_started_events_are_closed() {
    let mut inactive = event(5, Duration::days(1));
    inactive.is_active = false;
    let started = event(5, Duration::zero());

    for event in [inactive, started] {
        let store = store_with(&event).await;
        let manager = manager_over(&store, MockNotificationDispatcher::new());
        let result = manager.register(event.id, &actor()).await;
        assert!(matches!(
            result,
            Err(RegistrationError::Ineligible(EligibilityError::RegistrationClosed))
        ));
    }
}

#[tokio::test]
async fn test_last_seat_is_admitted_then_event_is_full() {
    let event = event(3, Duration::days(1));
    let store = store_with(&event).await;
    let manager = manager_over(&store, quiet_notifier());

    for _ in 0..2 {
        manager.register(event.id, &actor()).await.expect("admitted");
    }
    manager
        .register(event.id, &actor())
        .await
        .expect("last seat admitted");

    let overflow = manager.register(event.id, &actor()).await;
    assert!(matches!(
        overflow,
        Err(RegistrationError::Ineligible(EligibilityError::NoAvailableSeats))
    ));
}

#[tokio::test]
async fn test_registering_twice_is_rejected() {
    let event = event(5, Duration::days(1));
    let store = store_with(&event).await;
    let manager = manager_over(&store, quiet_notifier());
    let user = actor();

    manager.register(event.id, &user).await.expect("admitted");
    let again = manager.register(event.id, &user).await;

    assert!(matches!(
        again,
        Err(RegistrationError::Ineligible(EligibilityError::AlreadyRegistered))
    ));
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let store = MemoryStore::new();
    let manager = manager_over(&store, MockNotificationDispatcher::new());
    let missing = Uuid::new_v4();

    let result = manager.register(missing, &actor()).await;
    assert!(matches!(result, Err(RegistrationError::EventNotFound(id)) if id == missing));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_admit_exactly_one() {
    let event = event(10, Duration::days(1));
    let store = store_with(&event).await;
    let manager = Arc::new(manager_over(&store, quiet_notifier()));
    let user = actor();
    let event_id = event.id;

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.register(event_id, &user).await })
        })
        .collect();

    let mut admitted = 0;
    for attempt in attempts {
        match attempt.await.expect("task completes") {
            Ok(_) => admitted += 1,
            Err(RegistrationError::Ineligible(EligibilityError::AlreadyRegistered)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(admitted, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrants_never_exceed_capacity() {
    let event = event(3, Duration::days(1));
    let store = store_with(&event).await;
    let manager = Arc::new(manager_over(&store, quiet_notifier()));
    let event_id = event.id;

    let attempts: Vec<_> = (0..12)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.register(event_id, &actor()).await })
        })
        .collect();

    let mut admitted = 0;
    for attempt in attempts {
        match attempt.await.expect("task completes") {
            Ok(_) => admitted += 1,
            Err(RegistrationError::Ineligible(EligibilityError::NoAvailableSeats)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(admitted, 3);
}

#[tokio::test]
async fn test_dispatch_failure_keeps_registration() {
    let event = event(2, Duration::days(1));
    let store = store_with(&event).await;
    let mut notifier = MockNotificationDispatcher::new();
    notifier
        .expect_dispatch()
        .times(1)
        .returning(|_| Err(DispatchError::QueueFull));
    let manager = manager_over(&store, notifier);

    let registration = manager
        .register(event.id, &actor())
        .await
        .expect("registration survives dispatch failure");

    let stored = RegistrationRepository::find_by_id(&store, registration.id)
        .await
        .unwrap();
    assert_eq!(stored, Some(registration));
}

fn racing_manager(admission: AdmissionError) -> RegistrationManager {
    let record = EventRecord {
        event: event(5, Duration::days(1)),
        occupied_seats: 0,
    };

    let mut events = MockEventRepository::new();
    events
        .expect_find_by_id()
        .returning(move |_| Ok(Some(record.clone())));

    let mut registrations = MockRegistrationRepository::new();
    registrations
        .expect_list_for_event()
        .returning(|_| Ok(Vec::new()));
    let mut admission = Some(admission);
    registrations
        .expect_admit()
        .times(1)
        .returning(move |_| Err(admission.take().expect("admit called once")));

    let mut notifier = MockNotificationDispatcher::new();
    notifier.expect_dispatch().times(0);

    RegistrationManager::new(
        Arc::new(events),
        Arc::new(registrations),
        Arc::new(notifier),
        Arc::new(FixedClock(now())),
    )
}

#[tokio::test]
async fn test_storage_duplicate_after_precheck_maps_to_already_registered() {
    let manager = racing_manager(AdmissionError::Duplicate);
    let result = manager.register(Uuid::new_v4(), &actor()).await;
    assert!(matches!(
        result,
        Err(RegistrationError::Ineligible(EligibilityError::AlreadyRegistered))
    ));
}

#[tokio::test]
async fn test_storage_unique_violation_maps_to_already_registered() {
    let manager = racing_manager(AdmissionError::Repository(RepositoryError::Conflict(
        "registrations_event_user_key".to_string(),
    )));
    let result = manager.register(Uuid::new_v4(), &actor()).await;
    assert!(matches!(
        result,
        Err(RegistrationError::Ineligible(EligibilityError::AlreadyRegistered))
    ));
}

#[tokio::test]
async fn test_storage_capacity_after_precheck_maps_to_no_available_seats() {
    let manager = racing_manager(AdmissionError::CapacityExhausted);
    let result = manager.register(Uuid::new_v4(), &actor()).await;
    assert!(matches!(
        result,
        Err(RegistrationError::Ineligible(EligibilityError::NoAvailableSeats))
    ));
}

#[tokio::test]
async fn test_cancel_then_cancel_again() {
    let event = event(1, Duration::days(1));
    let store = store_with(&event).await;
    let manager = manager_over(&store, quiet_notifier());
    let user = actor();

    let registration = manager.register(event.id, &user).await.expect("admitted");
    let cancelled = manager
        .cancel(registration.id, &user)
        .await
        .expect("cancelled");
    assert_eq!(cancelled.status, RegistrationStatus::Cancelled);

    let again = manager.cancel(registration.id, &user).await;
    assert!(matches!(
        again,
        Err(RegistrationError::NotCancellable(CancellationError::AlreadyCancelled))
    ));
    let stored = RegistrationRepository::find_by_id(&store, registration.id)
        .await
        .unwrap()
        .expect("still stored");
    assert_eq!(stored, cancelled);
}

#[tokio::test]
async fn test_cancelled_seat_can_be_taken_by_someone_else() {
    let event = event(1, Duration::days(1));
    let store = store_with(&event).await;
    let manager = manager_over(&store, quiet_notifier());
    let first = actor();

    let registration = manager.register(event.id, &first).await.expect("admitted");
    manager
        .cancel(registration.id, &first)
        .await
        .expect("cancelled");

    manager
        .register(event.id, &actor())
        .await
        .expect("freed seat admitted");
    let rejoin = manager.register(event.id, &first).await;
    assert!(matches!(
        rejoin,
        Err(RegistrationError::Ineligible(EligibilityError::NoAvailableSeats))
    ));
}

#[tokio::test]
async fn test_cancel_after_event_started_is_rejected() {
    let past = event(1, -Duration::hours(1));
    let store = store_with(&past).await;
    let user = actor();
    let registration = store
        .admit(Registration::pending(past.id, user.id, now() - Duration::days(2)))
        .await
        .expect("seeded");
    let manager = manager_over(&store, MockNotificationDispatcher::new());

    let result = manager.cancel(registration.id, &user).await;
    assert!(matches!(
        result,
        Err(RegistrationError::NotCancellable(CancellationError::EventAlreadyOccurred))
    ));
}

#[tokio::test]
async fn test_cancel_requires_owner_or_staff() {
    let event = event(2, Duration::days(1));
    let store = store_with(&event).await;
    let manager = manager_over(&store, quiet_notifier());
    let owner = actor();
    let registration = manager.register(event.id, &owner).await.expect("admitted");

    let stranger = manager.cancel(registration.id, &actor()).await;
    assert!(matches!(stranger, Err(RegistrationError::Forbidden(_))));

    let by_staff = manager
        .cancel(registration.id, &staff())
        .await
        .expect("staff may cancel");
    assert_eq!(by_staff.status, RegistrationStatus::Cancelled);
}

#[tokio::test]
async fn test_remove_is_staff_only() {
    let event = event(2, Duration::days(1));
    let store = store_with(&event).await;
    let manager = manager_over(&store, quiet_notifier());
    let owner = actor();
    let registration = manager.register(event.id, &owner).await.expect("admitted");

    let by_owner = manager.remove(registration.id, &owner).await;
    assert!(matches!(by_owner, Err(RegistrationError::Forbidden(_))));

    let admin = staff();
    manager
        .remove(registration.id, &admin)
        .await
        .expect("staff may delete");
    let gone = manager.remove(registration.id, &admin).await;
    assert!(matches!(gone, Err(RegistrationError::RegistrationNotFound(_))));
}

#[tokio::test]
async fn test_list_for_event_requires_existing_event() {
    let store = MemoryStore::new();
    let manager = manager_over(&store, MockNotificationDispatcher::new());
    let result = manager.list_for_event(Uuid::new_v4()).await;
    assert!(matches!(result, Err(RegistrationError::EventNotFound(_))));
}
