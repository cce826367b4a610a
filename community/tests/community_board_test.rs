//! Community board tests: complaints, interruption alerts and events.
//!
//! Run with: `cargo test -p communitree --test community_board_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::{Duration, NaiveDate, NaiveTime};
use communitree::board::{NewCommunityEvent, NewComplaint, Rsvp};
use communitree::{CommuniTreeApp, CommunityError, Config};
use communitree_core::environment::Clock;
use communitree_testing::{
    FixedClock, InMemoryDocumentStore, InMemoryKeyValueStore, SequentialIdGenerator, test_clock,
};
use std::sync::Arc;

struct Harness {
    app: CommuniTreeApp,
    store: InMemoryDocumentStore,
    clock: Arc<FixedClock>,
}

fn harness() -> Harness {
    let clock = Arc::new(test_clock());
    let store = InMemoryDocumentStore::with_clock(clock.clone());
    let app = CommuniTreeApp::new(
        &Config::default(),
        Arc::new(store.clone()),
        Arc::new(InMemoryKeyValueStore::new()),
        clock.clone(),
        Arc::new(SequentialIdGenerator::new("doc-")),
    )
    .unwrap();
    Harness { app, store, clock }
}

fn complaint(title: &str) -> NewComplaint {
    NewComplaint {
        first_name: "Ana".to_string(),
        last_name: "Silva".to_string(),
        phone: "555-0100".to_string(),
        email: "ana@example.com".to_string(),
        issue_title: title.to_string(),
        description: "Details".to_string(),
        location: "Block A".to_string(),
        contact: "email".to_string(),
    }
}

fn event(title: &str, day: u32, hour: u32) -> NewCommunityEvent {
    NewCommunityEvent {
        title: title.to_string(),
        venue: "Clubhouse".to_string(),
        contact_information: "events@example.com".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
        from_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        to_time: NaiveTime::from_hms_opt(hour + 2, 0, 0).unwrap(),
        description: "All residents welcome".to_string(),
    }
}

#[tokio::test]
async fn recent_complaints_are_newest_first_and_limited() {
    let h = harness();
    for i in 1..=12 {
        h.app.submit_complaint(complaint(&format!("Issue {i}"))).await.unwrap();
        h.clock.advance(Duration::minutes(1));
    }

    let recent = h.app.recent_complaints(None).await.unwrap();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0].details.issue_title, "Issue 12");
    assert_eq!(recent[9].details.issue_title, "Issue 3");

    let latest_two = h.app.recent_complaints(Some(2)).await.unwrap();
    let titles: Vec<_> = latest_two.iter().map(|c| c.details.issue_title.as_str()).collect();
    assert_eq!(titles, ["Issue 12", "Issue 11"]);
}

#[tokio::test]
async fn submitted_complaint_round_trips() {
    let h = harness();
    let stored = h.app.submit_complaint(complaint("Broken lift")).await.unwrap();

    assert_eq!(stored.id, "doc-1");
    assert_eq!(stored.created_at, h.clock.now());
    assert_eq!(stored.details, complaint("Broken lift"));
}

#[tokio::test]
async fn latest_alerts_default_to_four() {
    let h = harness();
    for i in 1..=6 {
        h.app
            .publish_alert(&format!("WATER-{i}"), "Water off 9-11")
            .await
            .unwrap();
        h.clock.advance(Duration::minutes(5));
    }

    let alerts = h.app.latest_alerts(None).await.unwrap();
    let references: Vec<_> = alerts.iter().map(|a| a.reference.as_str()).collect();
    assert_eq!(references, ["WATER-6", "WATER-5", "WATER-4", "WATER-3"]);
}

#[tokio::test]
async fn events_list_in_calendar_order() {
    let h = harness();
    h.app.create_event(event("Pool party", 20, 15)).await.unwrap();
    h.app.create_event(event("Yoga", 5, 7)).await.unwrap();
    h.app.create_event(event("Book club", 20, 10)).await.unwrap();

    let events = h.app.list_events().await.unwrap();
    let titles: Vec<_> = events.iter().map(|e| e.details.title.as_str()).collect();
    assert_eq!(titles, ["Yoga", "Book club", "Pool party"]);
    assert!(events.iter().all(|e| e.accept_count == 0 && e.decline_count == 0));
}

#[tokio::test]
async fn rsvp_increments_the_matching_counter() {
    let h = harness();
    let created = h.app.create_event(event("Yoga", 5, 7)).await.unwrap();

    h.app.rsvp(&created.id, Rsvp::Accept).await.unwrap();
    h.app.rsvp(&created.id, Rsvp::Accept).await.unwrap();
    let updated = h.app.rsvp(&created.id, Rsvp::Decline).await.unwrap();

    assert_eq!(updated.accept_count, 2);
    assert_eq!(updated.decline_count, 1);
    assert_eq!(updated.details, created.details);

    let fetched = h.app.event(&created.id).await.unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let h = harness();

    let result = h.app.rsvp("missing", Rsvp::Accept).await;
    assert_eq!(
        result,
        Err(CommunityError::NotFound {
            collection: "events".to_string(),
            id: "missing".to_string(),
        })
    );
    assert!(matches!(
        h.app.event("missing").await,
        Err(CommunityError::NotFound { .. })
    ));
}

#[tokio::test]
async fn board_calls_fail_with_store_unavailable() {
    let h = harness();
    h.store.set_unavailable(true);

    assert!(matches!(
        h.app.submit_complaint(complaint("Leak")).await,
        Err(CommunityError::StoreUnavailable(_))
    ));
    assert!(matches!(
        h.app.latest_alerts(None).await,
        Err(CommunityError::StoreUnavailable(_))
    ));
    assert!(matches!(
        h.app.list_events().await,
        Err(CommunityError::StoreUnavailable(_))
    ));
}
