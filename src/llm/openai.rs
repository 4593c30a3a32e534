// src/llm/openai.rs
// OpenAI client: Responses API for reply generation, Embeddings API for
// RAG vectors. Both calls carry a 30-second request timeout.

use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::OpenAiConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: String,
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: "https://api.openai.com".to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    /// Generate an assistant reply for the enriched prompt.
    pub async fn generate_reply(&self, instructions: &str, input: &str) -> Result<String> {
        debug!("Generating reply for input ({} chars)", input.len());

        let body = ResponsesRequest {
            model: &self.model,
            instructions,
            input,
        };

        let response = self
            .client
            .post(format!("{}/v1/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("openai error {}: {}", status, error_text));
        }

        let parsed: ResponsesResponse = response.json().await?;
        let text = extract_output_text(&parsed);
        if text.is_empty() {
            return Err(anyhow!("empty response from model (no output_text items found)"));
        }
        Ok(text)
    }

    /// Embed a text, returning the raw float vector.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("openai embeddings error {}: {}", status, error_text));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .unwrap_or_default();
        if embedding.is_empty() {
            return Err(anyhow!("empty embedding"));
        }
        Ok(embedding)
    }
}

/// Concatenate the text segments of every assistant message in the output.
fn extract_output_text(response: &ResponsesResponse) -> String {
    let mut parts = Vec::new();
    for item in &response.output {
        if item.kind != "message" || item.role != "assistant" {
            continue;
        }
        for content in &item.content {
            if content.kind == "output_text" && !content.text.trim().is_empty() {
                parts.push(content.text.as_str());
            }
        }
    }
    parts.join("\n").trim().to_string()
}
