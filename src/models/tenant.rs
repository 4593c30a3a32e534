// src/models/tenant.rs
// Tenant identity, read-only here. Account management lives elsewhere;
// the ingress only needs the status gate.

use serde::Serialize;

pub const TENANT_STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub status: String,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TENANT_STATUS_ACTIVE
    }
}
