// src/outbound/mod.rs
// Outbound reply delivery with tenant-config fallback. A single send per
// reply: tenant credentials first, process-wide defaults second.

pub mod phone;
pub mod whatsapp;

pub use whatsapp::WhatsAppClient;

use anyhow::{Result, anyhow};
use reqwest::Client;
use sqlx::SqlitePool;
use tracing::warn;

use crate::config::MessengerConfig;
use crate::db;
use phone::normalize_whatsapp_to;

/// Deliver a reply to `recipient` on behalf of `tenant_id`.
///
/// Tenant credentials are preferred; when the tenant has none, or its send
/// fails, the process-wide defaults are tried. An error here never blocks
/// finalization of the event.
pub async fn send_reply(
    pool: &SqlitePool,
    http: &Client,
    config: &MessengerConfig,
    tenant_id: i64,
    recipient: &str,
    text: &str,
) -> Result<()> {
    let to = normalize_whatsapp_to(recipient, &config.default_country_code)?;

    if let Some(tenant_config) = db::tenants::messaging_config_for_tenant(pool, tenant_id).await? {
        let client = WhatsAppClient::from_tenant_config(http.clone(), &tenant_config);
        match client.send_text(&to, text).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(tenant_id, error = %e, "tenant send failed, falling back to default credentials");
            }
        }
    }

    match WhatsAppClient::from_defaults(http.clone(), config) {
        Some(client) => client.send_text(&to, text).await,
        None => Err(anyhow!(
            "no messaging credentials configured for tenant {}",
            tenant_id
        )),
    }
}
