// tests/scheduler_test.rs
// Optimistic claims, due-event ordering, finalization and stale-lease
// recovery in the event store.

use chrono::{Duration, Utc};
use penelope_backend::db::{self, EventStore};
use penelope_backend::models::EventStatus;

async fn test_store() -> EventStore {
    let pool = db::init_db("sqlite::memory:", 1)
        .await
        .expect("in-memory database");
    EventStore::new(pool)
}

#[tokio::test]
async fn only_one_claim_wins_under_contention() {
    let store = test_store().await;
    let t0 = Utc::now();

    let id = store
        .insert_debounced(1, "5511987654321", "m1", "oi", t0)
        .await
        .unwrap();

    let now = t0 + Duration::seconds(5);
    let (a, b) = tokio::join!(store.claim(id, now), store.claim(id, now));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a ^ b, "exactly one claim must win, got {} and {}", a, b);

    let event = store.get(id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Processing.as_str());
}

#[tokio::test]
async fn invalidated_events_cannot_be_claimed() {
    let store = test_store().await;
    let t0 = Utc::now();

    let first = store
        .insert_debounced(1, "5511987654321", "m1", "oi", t0)
        .await
        .unwrap();
    store
        .insert_debounced(1, "5511987654321", "m2", "tudo bem?", t0 + Duration::seconds(1))
        .await
        .unwrap();

    assert!(!store.claim(first, t0 + Duration::seconds(5)).await.unwrap());
}

#[tokio::test]
async fn due_events_come_back_in_schedule_order() {
    let store = test_store().await;
    let t0 = Utc::now();

    // Three senders, staggered arrivals: schedules land at t0+3, t0+4, t0+5.
    let late = store
        .insert_debounced(1, "5511900000003", "m3", "c", t0 + Duration::seconds(2))
        .await
        .unwrap();
    let early = store
        .insert_debounced(1, "5511900000001", "m1", "a", t0)
        .await
        .unwrap();
    let middle = store
        .insert_debounced(1, "5511900000002", "m2", "b", t0 + Duration::seconds(1))
        .await
        .unwrap();

    let due = store
        .due_events(t0 + Duration::seconds(10), 50)
        .await
        .unwrap();
    let ids: Vec<i64> = due.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![early, middle, late]);

    // The batch cap limits how many come back per tick.
    let capped = store.due_events(t0 + Duration::seconds(10), 2).await.unwrap();
    assert_eq!(capped.len(), 2);
    assert_eq!(capped[0].id, early);
}

#[tokio::test]
async fn finalized_events_carry_reply_and_processed_at() {
    let store = test_store().await;
    let t0 = Utc::now();

    let id = store
        .insert_debounced(1, "5511987654321", "m1", "oi", t0)
        .await
        .unwrap();
    assert!(store.claim(id, t0 + Duration::seconds(5)).await.unwrap());

    let processed_at = t0 + Duration::seconds(6);
    store
        .mark_done(id, "olá! como posso ajudar?", processed_at)
        .await
        .unwrap();

    let event = store.get(id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Done.as_str());
    assert_eq!(event.reply_text, "olá! como posso ajudar?");
    assert!(event.processed_at.is_some());

    // Done events never show up in a due scan again.
    assert!(
        store
            .due_events(t0 + Duration::seconds(60), 50)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn stale_processing_events_return_to_pending() {
    let store = test_store().await;
    let t0 = Utc::now();

    let id = store
        .insert_debounced(1, "5511987654321", "m1", "oi", t0)
        .await
        .unwrap();
    assert!(store.claim(id, t0 + Duration::seconds(5)).await.unwrap());

    // Inside the lease nothing is released.
    let released = store
        .release_stale_processing(t0 + Duration::seconds(65), Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(released, 0);

    // Past the lease the claim is abandoned and the event reschedules.
    let now = t0 + Duration::minutes(6);
    let released = store
        .release_stale_processing(now, Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(released, 1);

    let event = store.get(id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Pending.as_str());

    let due = store.due_events(now, 50).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, id);
}
