// src/rag/similarity.rs
// Embedding parsing and cosine scoring over JSON float arrays.

use anyhow::{Result, anyhow};

/// Decode a stored embedding (JSON float array). Fails on malformed JSON,
/// empty vectors and non-finite components.
pub fn parse_embedding(raw: &str) -> Result<Vec<f32>> {
    let values: Vec<f32> = serde_json::from_str(raw)?;
    if values.is_empty() {
        return Err(anyhow!("empty embedding vector"));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(anyhow!("embedding contains non-finite values"));
    }
    Ok(values)
}

/// Cosine similarity over the first `min(|a|, |b|)` dimensions.
/// Undefined (None) when either truncated vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    let n = a.len().min(b.len());
    if n == 0 {
        return None;
    }

    let dot: f32 = a[..n].iter().zip(&b[..n]).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a[..n].iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b[..n].iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        None
    } else {
        Some(dot / (norm_a * norm_b))
    }
}
