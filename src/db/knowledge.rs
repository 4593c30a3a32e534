// src/db/knowledge.rs
// Read-only access to tenant knowledge snippets for RAG scoring.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::KnowledgeSnippet;

/// All snippets for a tenant that carry an embedding. Malformed embeddings
/// are filtered later, at parse time.
pub async fn snippets_for_tenant(
    pool: &SqlitePool,
    tenant_id: i64,
) -> Result<Vec<KnowledgeSnippet>> {
    let snippets = sqlx::query_as::<_, KnowledgeSnippet>(
        r#"
        SELECT id, tenant_id, category_id, content, embedding
        FROM knowledge_snippets
        WHERE tenant_id = ? AND embedding != ''
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(snippets)
}
