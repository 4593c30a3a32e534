// src/models/event.rs
// Inbound message events and their lifecycle status.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an inbound event.
///
/// Allowed transitions: PENDING -> PROCESSING | INVALIDATED,
/// PROCESSING -> DONE. Reverse transitions never happen, except the
/// stale-lease release which returns an abandoned PROCESSING row to PENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Pending,
    Processing,
    Done,
    Invalidated,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Processing => "processing",
            EventStatus::Done => "done",
            EventStatus::Invalidated => "invalidated",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(EventStatus::Pending),
            "processing" => Ok(EventStatus::Processing),
            "done" => Ok(EventStatus::Done),
            "invalidated" => Ok(EventStatus::Invalidated),
            _ => Err(anyhow!("unknown event status: {}", s)),
        }
    }
}

/// One inbound message turn, possibly coalesced from a burst.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Event {
    pub id: i64,
    pub tenant_id: i64,
    /// Opaque sender identifier, e.g. a phone in international format.
    pub sender: String,
    /// Provider-assigned id of the (last) raw inbound message.
    pub message_id: String,
    pub text: String,
    pub reply_text: String,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub invalidated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn has_status(&self, status: EventStatus) -> bool {
        self.status == status.as_str()
    }
}
