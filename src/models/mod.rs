// src/models/mod.rs

pub mod event;
pub mod knowledge;
pub mod messaging_config;
pub mod tenant;

pub use event::{Event, EventStatus};
pub use knowledge::KnowledgeSnippet;
pub use messaging_config::TenantMessagingConfig;
pub use tenant::Tenant;
