// src/db/tenants.rs
// Read-only access to tenant identity and messaging credentials. Both
// tables are owned by external CRUD surfaces.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::{Tenant, TenantMessagingConfig};

pub async fn get_tenant(pool: &SqlitePool, id: i64) -> Result<Option<Tenant>> {
    let tenant = sqlx::query_as::<_, Tenant>("SELECT id, name, status FROM tenants WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tenant)
}

pub async fn messaging_config_for_tenant(
    pool: &SqlitePool,
    tenant_id: i64,
) -> Result<Option<TenantMessagingConfig>> {
    let config = sqlx::query_as::<_, TenantMessagingConfig>(
        r#"
        SELECT id, tenant_id, phone_number_id, access_token, api_version, status
        FROM tenant_messaging_configs
        WHERE tenant_id = ?
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    Ok(config)
}
