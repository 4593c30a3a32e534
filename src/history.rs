// src/history.rs
// Conversation-history enrichment: recent completed turns for the same
// (tenant, sender), rendered as a chronological transcript.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::config::HistoryConfig;
use crate::db::EventStore;
use crate::models::Event;
use crate::utils::truncate_chars;

const LINE_MAX_CHARS: usize = 800;

const TRANSCRIPT_HEADER: &str = "Histórico recente da conversa (mais antigo primeiro):";

/// Fetch and render the transcript for the turn being handled. Empty when
/// there is no usable history.
pub async fn build_history(
    store: &EventStore,
    config: &HistoryConfig,
    tenant_id: i64,
    sender: &str,
    current_event_id: i64,
    now: DateTime<Utc>,
) -> Result<String> {
    let since = now - Duration::minutes(config.window_minutes as i64);
    let mut events = store
        .recent_done(
            tenant_id,
            sender,
            since,
            current_event_id,
            config.max_events as i64,
        )
        .await?;

    // Store returns newest first; the transcript reads oldest first.
    events.reverse();
    Ok(render_transcript(&events))
}

/// Render completed turns as user/assistant lines, oldest first. Blank
/// sides of a turn are omitted.
pub fn render_transcript(events: &[Event]) -> String {
    if events.is_empty() {
        return String::new();
    }

    let mut out = String::from(TRANSCRIPT_HEADER);
    out.push('\n');
    for event in events {
        let user = event.text.trim();
        if !user.is_empty() {
            out.push_str("- Usuário: ");
            out.push_str(&truncate_chars(user, LINE_MAX_CHARS));
            out.push('\n');
        }
        let assistant = event.reply_text.trim();
        if !assistant.is_empty() {
            out.push_str("- Assistente: ");
            out.push_str(&truncate_chars(assistant, LINE_MAX_CHARS));
            out.push('\n');
        }
    }

    out.trim_end().to_string()
}
