// src/db/mod.rs
// SQLite pool construction and schema bootstrap.

pub mod events;
pub mod knowledge;
pub mod tenants;

pub use events::EventStore;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Connect the pool and make sure the schema exists.
///
/// The events table is owned by this process; the tenant, knowledge and
/// messaging-config tables are written by the external CRUD surfaces and
/// only read here, but the bootstrap creates them so a fresh database is
/// immediately usable.
pub async fn init_db(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenants (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL DEFAULT '',
            status      TEXT NOT NULL DEFAULT 'active',
            created_at  TEXT,
            updated_at  TEXT
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id       INTEGER NOT NULL DEFAULT 0,
            sender          TEXT NOT NULL,
            message_id      TEXT NOT NULL DEFAULT '',
            text            TEXT NOT NULL DEFAULT '',
            reply_text      TEXT NOT NULL DEFAULT '',
            status          TEXT NOT NULL DEFAULT 'pending',
            scheduled_at    TEXT,
            processed_at    TEXT,
            invalidated_at  TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_events_status_scheduled ON events(status, scheduled_at)",
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_events_tenant_sender ON events(tenant_id, sender, status)",
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_snippets (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id   INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            content     TEXT NOT NULL DEFAULT '',
            embedding   TEXT NOT NULL DEFAULT '',
            created_at  TEXT,
            updated_at  TEXT,
            UNIQUE (tenant_id, category_id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenant_messaging_configs (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id       INTEGER NOT NULL UNIQUE,
            phone_number_id TEXT NOT NULL,
            access_token    TEXT NOT NULL,
            api_version     TEXT NOT NULL DEFAULT 'v24.0',
            status          TEXT NOT NULL DEFAULT 'pending',
            created_at      TEXT,
            updated_at      TEXT
        )
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}
