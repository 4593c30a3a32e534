// src/models/knowledge.rs
// Tenant-authored knowledge snippets with precomputed embeddings.
// One snippet per (tenant, category); written by the CRUD surface,
// read-only for the reply pipeline.

use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct KnowledgeSnippet {
    pub id: i64,
    pub tenant_id: i64,
    pub category_id: i64,
    pub content: String,
    /// Embedding vector serialized as a JSON float array.
    pub embedding: String,
}
