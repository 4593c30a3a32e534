// src/models/messaging_config.rs
// Per-tenant WhatsApp Cloud API credentials for outbound sends.

use serde::Serialize;

pub const MESSAGING_STATUS_PENDING: &str = "pending";
pub const MESSAGING_STATUS_REGISTERED: &str = "registered";

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TenantMessagingConfig {
    pub id: i64,
    pub tenant_id: i64,
    pub phone_number_id: String,
    pub access_token: String,
    pub api_version: String,
    pub status: String,
}
