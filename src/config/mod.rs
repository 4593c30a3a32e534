// src/config/mod.rs
// Environment-driven configuration. Required values fail startup when
// missing or out of range; the process refuses to run half-configured.

pub mod helpers;

use anyhow::{Result, anyhow};

/// Default persona plus anti-hallucination rules sent as the model's system
/// instruction when OPENAI_SYSTEM_PROMPT is not set.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Você é a Penélope, um chatbot útil, educado e direto. \
Responda em português do Brasil. Use apenas as informações disponíveis na conversa e no \
contexto fornecido; quando não souber, diga que não sabe em vez de inventar dados, planos ou preços.";

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub webhook: WebhookConfig,
    pub openai: OpenAiConfig,
    pub messenger: MessengerConfig,
    pub history: HistoryConfig,
    pub rag: RagConfig,
    pub worker: WorkerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            webhook: WebhookConfig::from_env()?,
            openai: OpenAiConfig::from_env()?,
            messenger: MessengerConfig::from_env(),
            history: HistoryConfig::from_env()?,
            rag: RagConfig::from_env()?,
            worker: WorkerConfig::from_env()?,
        })
    }
}

/// Database pool settings. The database URL itself is a CLI/env flag on the
/// binary (see main.rs); only pool tuning lives here.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            max_connections: helpers::env_parsed_or("SQLITE_MAX_CONNECTIONS", 5)?,
        })
    }
}

/// Webhook ingress secrets. Both are required: without the app secret,
/// signature verification would be silently skipped.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub app_secret: String,
    pub verify_token: String,
    /// Dev-only fallback for the bare /webhook path (no tenant segment).
    pub default_tenant_id: Option<i64>,
}

impl WebhookConfig {
    pub fn from_env() -> Result<Self> {
        let default_tenant_id = match helpers::env_opt("WEBHOOK_DEFAULT_TENANT_ID") {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|e| anyhow!("failed to parse WEBHOOK_DEFAULT_TENANT_ID: {}", e))?,
            ),
            None => None,
        };
        Ok(Self {
            app_secret: helpers::require_env("WEBHOOK_APP_SECRET")?,
            verify_token: helpers::require_env("WEBHOOK_VERIFY_TOKEN")?,
            default_tenant_id,
        })
    }
}

/// OpenAI API settings for reply generation and embeddings.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub embedding_model: String,
    pub system_prompt: String,
    /// Optional process-wide context appended to the system instruction.
    pub global_context: Option<String>,
}

impl OpenAiConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: helpers::require_env("OPENAI_API_KEY")?,
            model: helpers::env_or("OPENAI_MODEL", "gpt-4.1-mini"),
            embedding_model: helpers::env_or("OPENAI_EMBEDDING_MODEL", "text-embedding-3-small"),
            system_prompt: helpers::env_or("OPENAI_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            global_context: helpers::env_opt("OPENAI_GLOBAL_CONTEXT"),
        })
    }

    /// Full system instruction for the model call.
    pub fn instructions(&self) -> String {
        match &self.global_context {
            Some(context) => format!("{}\n\n{}", self.system_prompt, context),
            None => self.system_prompt.clone(),
        }
    }
}

/// Process-wide WhatsApp Cloud credentials, used when a tenant has no
/// messaging config of its own (or its send fails).
#[derive(Debug, Clone)]
pub struct MessengerConfig {
    pub default_access_token: Option<String>,
    pub default_phone_number_id: Option<String>,
    pub default_api_version: String,
    pub default_country_code: String,
}

impl MessengerConfig {
    pub fn from_env() -> Self {
        Self {
            default_access_token: helpers::env_opt("WHATSAPP_ACCESS_TOKEN"),
            default_phone_number_id: helpers::env_opt("WHATSAPP_PHONE_NUMBER_ID"),
            default_api_version: helpers::env_or("WHATSAPP_API_VERSION", "v20.0"),
            default_country_code: helpers::env_or("DEFAULT_COUNTRY_CODE", "55"),
        }
    }
}

/// Conversation-history lookback. Both values are required configuration:
/// the system refuses to run with an unbounded history.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Lookback window in minutes (1..=1440).
    pub window_minutes: u32,
    /// Maximum prior turns included (1..=50).
    pub max_events: u32,
}

impl HistoryConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            window_minutes: helpers::require_env_parsed("HISTORY_WINDOW_MINUTES")?,
            max_events: helpers::require_env_parsed("HISTORY_MAX_EVENTS")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=1440).contains(&self.window_minutes) {
            return Err(anyhow!(
                "HISTORY_WINDOW_MINUTES must be between 1 and 1440, got {}",
                self.window_minutes
            ));
        }
        if !(1..=50).contains(&self.max_events) {
            return Err(anyhow!(
                "HISTORY_MAX_EVENTS must be between 1 and 50, got {}",
                self.max_events
            ));
        }
        Ok(())
    }
}

/// Snippet selection policy for the RAG context builder.
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Top-K cap on selected snippets (1..=20).
    pub top_k: usize,
    /// Minimum cosine score for selection (-1..=1).
    pub min_score: f32,
}

impl RagConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            top_k: helpers::env_parsed_or("RAG_TOP_K", 4)?,
            min_score: helpers::env_parsed_or("RAG_MIN_SCORE", 0.55)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=20).contains(&self.top_k) {
            return Err(anyhow!("RAG_TOP_K must be between 1 and 20, got {}", self.top_k));
        }
        if !(-1.0..=1.0).contains(&self.min_score) {
            return Err(anyhow!(
                "RAG_MIN_SCORE must be between -1 and 1, got {}",
                self.min_score
            ));
        }
        Ok(())
    }
}

/// Reply-worker dispatch bound, on top of the per-tick claim batch.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub max_concurrency: usize,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            max_concurrency: helpers::env_parsed_or("EVENTS_MAX_CONCURRENCY", 16)?,
        };
        if config.max_concurrency == 0 {
            return Err(anyhow!("EVENTS_MAX_CONCURRENCY must be at least 1"));
        }
        Ok(config)
    }
}
