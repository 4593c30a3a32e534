// src/workers/events.rs
// Due-event scheduler: one periodic scan claims pending events via an
// optimistic status update and dispatches a reply worker per claim. The
// loop never waits for workers; the next tick continues from the store.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::guardrails;
use crate::history;
use crate::models::{Event, EventStatus};
use crate::outbound;
use crate::rag;
use crate::state::AppState;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const CLAIM_BATCH_SIZE: i64 = 50;
/// Whole-turn deadline: history + RAG + model + outbound send.
pub const WORKER_DEADLINE: Duration = Duration::from_secs(60);
/// A PROCESSING row older than this lost its worker and goes back to PENDING.
pub const PROCESSING_LEASE_MINUTES: i64 = 5;

pub fn spawn_event_processor(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting event processor loop");
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = process_due_events(&state).await {
                error!(error = %e, "event processor tick failed");
            }
        }
    })
}

async fn process_due_events(state: &Arc<AppState>) -> anyhow::Result<()> {
    let now = Utc::now();

    let released = state
        .events
        .release_stale_processing(now, ChronoDuration::minutes(PROCESSING_LEASE_MINUTES))
        .await?;
    if released > 0 {
        warn!(released, "released stale processing events back to pending");
    }

    let due = state.events.due_events(now, CLAIM_BATCH_SIZE).await?;
    for event in due {
        // Optimistic claim; losing it is normal under contention or when
        // the debouncer invalidated the event after the scan.
        if !state.events.claim(event.id, Utc::now()).await? {
            continue;
        }

        let permit = state.worker_slots.clone().acquire_owned().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let _permit = permit;
            handle_event(state, event.id).await;
        });
    }

    Ok(())
}

/// Handle one claimed event end to end. Always finalizes: whatever happens
/// inside the deadline, the event leaves PROCESSING with a reply recorded.
async fn handle_event(state: Arc<AppState>, event_id: i64) {
    let event = match state.events.get(event_id).await {
        Ok(Some(event)) => event,
        Ok(None) => return,
        Err(e) => {
            error!(event_id, error = %e, "failed to load claimed event");
            return;
        }
    };
    if !event.has_status(EventStatus::Processing) {
        return;
    }

    let reply = match tokio::time::timeout(WORKER_DEADLINE, run_turn(&state, &event)).await {
        Ok(reply) => reply,
        Err(_) => {
            warn!(event_id, "worker deadline expired, finalizing with degraded reply");
            guardrails::MODEL_FAILURE_REPLY.to_string()
        }
    };

    if let Err(e) = state.events.mark_done(event_id, &reply, Utc::now()).await {
        error!(event_id, error = %e, "failed to finalize event");
    }
}

/// Enrich, generate and send. Every step degrades instead of failing the
/// turn; the returned text is what gets recorded on the event.
async fn run_turn(state: &AppState, event: &Event) -> String {
    let transcript = match history::build_history(
        &state.events,
        &state.config.history,
        event.tenant_id,
        &event.sender,
        event.id,
        Utc::now(),
    )
    .await
    {
        Ok(transcript) => transcript,
        Err(e) => {
            warn!(event_id = event.id, error = %e, "history lookup failed, continuing without it");
            String::new()
        }
    };

    let context = rag::build_question_context(
        &state.db,
        &state.llm,
        &state.config.rag,
        event.tenant_id,
        &event.text,
    )
    .await;

    let reply = if guardrails::needs_clarification(&event.text, context.selected) {
        info!(event_id = event.id, "business question without tenant context, asking for detail");
        guardrails::CLARIFICATION_REPLY.to_string()
    } else {
        let input = compose_input(&transcript, &context.prompt);
        let instructions = state.config.openai.instructions();
        match state.llm.generate_reply(&instructions, &input).await {
            Ok(text) => text,
            Err(e) => {
                error!(event_id = event.id, error = %e, "model call failed, using degraded reply");
                guardrails::MODEL_FAILURE_REPLY.to_string()
            }
        }
    };

    if let Err(e) = outbound::send_reply(
        &state.db,
        &state.http,
        &state.config.messenger,
        event.tenant_id,
        &event.sender,
        &reply,
    )
    .await
    {
        // DONE means "turn computed and attempted", not "delivered".
        error!(event_id = event.id, error = %e, "failed to send reply");
    }

    reply
}

fn compose_input(transcript: &str, prompt: &str) -> String {
    if transcript.is_empty() {
        prompt.to_string()
    } else {
        format!("{}\n\n{}", transcript, prompt)
    }
}
