// tests/history_test.rs
// History builder against the event store: ordering, window, exclusions.

use chrono::{DateTime, Duration, Utc};
use penelope_backend::config::HistoryConfig;
use penelope_backend::db::{self, EventStore};
use penelope_backend::history::build_history;

async fn test_store() -> EventStore {
    let pool = db::init_db("sqlite::memory:", 1)
        .await
        .expect("in-memory database");
    EventStore::new(pool)
}

fn history_config() -> HistoryConfig {
    HistoryConfig {
        window_minutes: 30,
        max_events: 5,
    }
}

/// Insert, claim and finalize one turn at the given processing instant.
async fn seed_done_turn(
    store: &EventStore,
    sender: &str,
    text: &str,
    reply: &str,
    processed_at: DateTime<Utc>,
) -> i64 {
    let inserted_at = processed_at - Duration::seconds(10);
    let id = store
        .insert_debounced(1, sender, "m", text, inserted_at)
        .await
        .unwrap();
    assert!(store.claim(id, processed_at).await.unwrap());
    store.mark_done(id, reply, processed_at).await.unwrap();
    id
}

#[tokio::test]
async fn transcript_lists_prior_turns_oldest_first() {
    let store = test_store().await;
    let now = Utc::now();
    let sender = "5511987654321";

    seed_done_turn(&store, sender, "oi", "olá!", now - Duration::seconds(600)).await;
    seed_done_turn(
        &store,
        sender,
        "qual o horário?",
        "das 9h às 18h",
        now - Duration::seconds(300),
    )
    .await;
    seed_done_turn(
        &store,
        sender,
        "e aos sábados?",
        "não abrimos",
        now - Duration::seconds(60),
    )
    .await;

    let current = store.insert_debounced(1, sender, "m4", "ok", now).await.unwrap();

    let transcript = build_history(&store, &history_config(), 1, sender, current, now)
        .await
        .unwrap();
    let lines: Vec<&str> = transcript.lines().collect();

    assert_eq!(lines.len(), 7);
    assert_eq!(lines[1], "- Usuário: oi");
    assert_eq!(lines[2], "- Assistente: olá!");
    assert_eq!(lines[3], "- Usuário: qual o horário?");
    assert_eq!(lines[4], "- Assistente: das 9h às 18h");
    assert_eq!(lines[5], "- Usuário: e aos sábados?");
    assert_eq!(lines[6], "- Assistente: não abrimos");
}

#[tokio::test]
async fn turns_outside_the_window_are_dropped() {
    let store = test_store().await;
    let now = Utc::now();
    let sender = "5511987654321";

    seed_done_turn(&store, sender, "antiga", "resposta antiga", now - Duration::minutes(40)).await;
    seed_done_turn(&store, sender, "recente", "resposta recente", now - Duration::minutes(5)).await;

    let transcript = build_history(&store, &history_config(), 1, sender, 0, now)
        .await
        .unwrap();

    assert!(transcript.contains("recente"));
    assert!(!transcript.contains("antiga"));
}

#[tokio::test]
async fn the_current_turn_is_excluded() {
    let store = test_store().await;
    let now = Utc::now();
    let sender = "5511987654321";

    let current =
        seed_done_turn(&store, sender, "pergunta atual", "resposta atual", now).await;
    seed_done_turn(&store, sender, "anterior", "resposta anterior", now - Duration::minutes(2))
        .await;

    let transcript = build_history(&store, &history_config(), 1, sender, current, now)
        .await
        .unwrap();

    assert!(transcript.contains("anterior"));
    assert!(!transcript.contains("pergunta atual"));
}

#[tokio::test]
async fn max_events_keeps_only_the_newest_turns() {
    let store = test_store().await;
    let now = Utc::now();
    let sender = "5511987654321";

    for i in 0..4 {
        seed_done_turn(
            &store,
            sender,
            &format!("pergunta {}", i),
            &format!("resposta {}", i),
            now - Duration::minutes(10 - i),
        )
        .await;
    }

    let config = HistoryConfig {
        window_minutes: 30,
        max_events: 2,
    };
    let transcript = build_history(&store, &config, 1, sender, 0, now).await.unwrap();

    // Only the two newest turns survive, still oldest-first.
    assert!(!transcript.contains("pergunta 0"));
    assert!(!transcript.contains("pergunta 1"));
    let pos2 = transcript.find("pergunta 2").unwrap();
    let pos3 = transcript.find("pergunta 3").unwrap();
    assert!(pos2 < pos3);
}

#[tokio::test]
async fn other_senders_do_not_leak_into_the_transcript() {
    let store = test_store().await;
    let now = Utc::now();

    seed_done_turn(&store, "5511911111111", "segredo", "resposta", now - Duration::minutes(1))
        .await;

    let transcript = build_history(
        &store,
        &history_config(),
        1,
        "5511987654321",
        0,
        now,
    )
    .await
    .unwrap();

    assert_eq!(transcript, "");
}
