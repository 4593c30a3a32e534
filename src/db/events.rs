// src/db/events.rs
// Event store: sole writer of event rows. Debounce coalescing runs in a
// per-message transaction; claims are optimistic status updates checked
// via rows-affected.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::models::{Event, EventStatus};

/// Delay between the last message of a burst and the event becoming due.
pub const DEBOUNCE_DELAY_SECONDS: i64 = 3;

const EVENT_COLUMNS: &str = "id, tenant_id, sender, message_id, text, reply_text, status, \
     scheduled_at, processed_at, invalidated_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Coalesce a burst: invalidate the sender's still-pending event (if
    /// any), then insert a new pending row scheduled `DEBOUNCE_DELAY_SECONDS`
    /// from `now`, carrying the prior text plus the new fragment.
    ///
    /// Runs in a single transaction so concurrent deliveries for the same
    /// (tenant, sender) serialize and the at-most-one-pending invariant
    /// holds. Returns the new event id.
    pub async fn insert_debounced(
        &self,
        tenant_id: i64,
        sender: &str,
        message_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let scheduled = now + Duration::seconds(DEBOUNCE_DELAY_SECONDS);
        let mut tx = self.pool.begin().await?;

        let prior: Option<(i64, String)> = sqlx::query_as(
            r#"
            SELECT id, text FROM events
            WHERE tenant_id = ? AND sender = ? AND status = ?
              AND scheduled_at IS NOT NULL AND scheduled_at > ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(sender)
        .bind(EventStatus::Pending.as_str())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let mut combined = text.trim().to_string();
        if let Some((prior_id, prior_text)) = prior {
            sqlx::query("UPDATE events SET status = ?, invalidated_at = ?, updated_at = ? WHERE id = ?")
                .bind(EventStatus::Invalidated.as_str())
                .bind(now)
                .bind(now)
                .bind(prior_id)
                .execute(&mut *tx)
                .await?;

            let prior_text = prior_text.trim();
            if !prior_text.is_empty() {
                combined = format!("{}\n{}", prior_text, text.trim());
            }
        }

        let result = sqlx::query(
            r#"
            INSERT INTO events (tenant_id, sender, message_id, text, status, scheduled_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tenant_id)
        .bind(sender)
        .bind(message_id)
        .bind(&combined)
        .bind(EventStatus::Pending.as_str())
        .bind(scheduled)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    /// Pending events whose schedule has elapsed, FIFO within the batch.
    pub async fn due_events(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE status = ? AND scheduled_at IS NOT NULL AND scheduled_at <= ?
            ORDER BY scheduled_at ASC, id ASC
            LIMIT ?
            "#,
        ))
        .bind(EventStatus::Pending.as_str())
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Optimistic claim: PENDING -> PROCESSING, predicated on the row still
    /// being PENDING. Returns false when another worker won the claim or the
    /// event was invalidated in between.
    pub async fn claim(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE events SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(EventStatus::Processing.as_str())
            .bind(now)
            .bind(id)
            .bind(EventStatus::Pending.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ?",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Finalize a turn: PROCESSING -> DONE with the computed reply, whether
    /// or not the outbound send succeeded.
    pub async fn mark_done(
        &self,
        id: i64,
        reply_text: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE events SET status = ?, reply_text = ?, processed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(EventStatus::Done.as_str())
        .bind(reply_text)
        .bind(processed_at)
        .bind(processed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Completed turns for the same (tenant, sender) inside the lookback
    /// window, newest first, excluding the turn currently being handled.
    pub async fn recent_done(
        &self,
        tenant_id: i64,
        sender: &str,
        since: DateTime<Utc>,
        exclude_id: i64,
        limit: i64,
    ) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE tenant_id = ? AND sender = ? AND status = ?
              AND processed_at IS NOT NULL AND processed_at >= ?
              AND id != ?
            ORDER BY processed_at DESC, id DESC
            LIMIT ?
            "#,
        ))
        .bind(tenant_id)
        .bind(sender)
        .bind(EventStatus::Done.as_str())
        .bind(since)
        .bind(exclude_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Lease recovery for workers that died mid-handling: PROCESSING rows
    /// whose claim timestamp is older than `lease` go back to PENDING with
    /// their schedule advanced to `now`. Returns how many were released.
    pub async fn release_stale_processing(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<u64> {
        let cutoff = now - lease;
        let result = sqlx::query(
            "UPDATE events SET status = ?, scheduled_at = ?, updated_at = ? WHERE status = ? AND updated_at <= ?",
        )
        .bind(EventStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .bind(EventStatus::Processing.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
