// src/state.rs
// Application state shared across handlers and workers.

use anyhow::Result;
use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::db::EventStore;
use crate::llm::OpenAiClient;

const MESSENGER_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppState {
    pub db: SqlitePool,
    pub events: EventStore,
    pub llm: OpenAiClient,
    /// Shared client for outbound messenger calls.
    pub http: Client,
    pub config: Config,
    /// Bounds how many reply workers run at once.
    pub worker_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config) -> Result<Self> {
        let llm = OpenAiClient::new(&config.openai)?;
        let http = Client::builder().timeout(MESSENGER_TIMEOUT).build()?;
        let worker_slots = Arc::new(Semaphore::new(config.worker.max_concurrency));

        Ok(Self {
            events: EventStore::new(db.clone()),
            db,
            llm,
            http,
            config,
            worker_slots,
        })
    }
}
