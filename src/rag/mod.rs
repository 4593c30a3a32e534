// src/rag/mod.rs
// RAG context builder: embed the question, score the tenant's knowledge
// snippets by cosine similarity and wrap the best matches around the
// question. Best-effort: any failure degrades to the raw question.

pub mod similarity;

use sqlx::SqlitePool;
use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::config::RagConfig;
use crate::db;
use crate::llm::OpenAiClient;
use crate::models::KnowledgeSnippet;
use crate::utils::truncate_chars;
use similarity::{cosine_similarity, parse_embedding};

/// Keywords that mark a question as price-related.
pub const PRICE_QUESTION_KEYWORDS: [&str; 6] =
    ["preço", "preco", "custo", "custa", "valor", "quanto"];

/// Markers of pricing content inside a snippet.
pub const PRICE_CONTENT_KEYWORDS: [&str; 6] = ["r$", "reais", "custo", "preço", "preco", "valor"];

/// Relaxed score floor for the price-question fallback.
pub const PRICE_FALLBACK_MIN_SCORE: f32 = 0.40;

const SNIPPET_MAX_CHARS: usize = 600;

const CONTEXT_PREFACE: &str = "Use o contexto abaixo quando for relevante para responder. \
Ignore itens que não tenham relação com a pergunta.";

/// Result of the context build: the prompt to send downstream and how many
/// snippets made the cut (zero means the prompt is the raw question).
#[derive(Debug, Clone)]
pub struct RagOutcome {
    pub prompt: String,
    pub selected: usize,
}

impl RagOutcome {
    fn raw(question: &str) -> Self {
        Self {
            prompt: question.to_string(),
            selected: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredSnippet {
    pub content: String,
    pub score: f32,
}

/// Build the question context for one tenant.
pub async fn build_question_context(
    pool: &SqlitePool,
    llm: &OpenAiClient,
    config: &RagConfig,
    tenant_id: i64,
    question: &str,
) -> RagOutcome {
    let question_embedding = match llm.embed_text(question).await {
        Ok(embedding) => embedding,
        Err(e) => {
            warn!(tenant_id, error = %e, "question embedding failed, answering without context");
            return RagOutcome::raw(question);
        }
    };

    let snippets = match db::knowledge::snippets_for_tenant(pool, tenant_id).await {
        Ok(snippets) => snippets,
        Err(e) => {
            warn!(tenant_id, error = %e, "failed to load knowledge snippets, answering without context");
            return RagOutcome::raw(question);
        }
    };

    let scored = score_snippets(&question_embedding, snippets);
    let selected = select_snippets(&scored, config.top_k, config.min_score, question);
    if selected.is_empty() {
        debug!(tenant_id, candidates = scored.len(), "no snippet cleared the selection policy");
        return RagOutcome::raw(question);
    }

    RagOutcome {
        selected: selected.len(),
        prompt: render_prompt(&selected, question),
    }
}

/// Score every decodable snippet against the question embedding and sort
/// descending. Malformed embeddings and zero-norm vectors are skipped.
pub fn score_snippets(
    question_embedding: &[f32],
    snippets: Vec<KnowledgeSnippet>,
) -> Vec<ScoredSnippet> {
    let mut scored: Vec<ScoredSnippet> = snippets
        .into_iter()
        .filter_map(|snippet| {
            let embedding = match parse_embedding(&snippet.embedding) {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(snippet_id = snippet.id, error = %e, "skipping snippet with bad embedding");
                    return None;
                }
            };
            let score = cosine_similarity(question_embedding, &embedding)?;
            Some(ScoredSnippet {
                content: snippet.content,
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored
}

/// Selection policy: at most `top_k` snippets at or above `min_score`,
/// descending. When that yields nothing and the question is about price,
/// fall back to the single top snippet if it looks like pricing content
/// and clears the relaxed floor.
pub fn select_snippets<'a>(
    scored: &'a [ScoredSnippet],
    top_k: usize,
    min_score: f32,
    question: &str,
) -> Vec<&'a ScoredSnippet> {
    let picked: Vec<&ScoredSnippet> = scored
        .iter()
        .filter(|s| s.score >= min_score)
        .take(top_k)
        .collect();
    if !picked.is_empty() {
        return picked;
    }

    if let Some(top) = scored.first() {
        if mentions_any(question, &PRICE_QUESTION_KEYWORDS)
            && top.score >= PRICE_FALLBACK_MIN_SCORE
            && mentions_any(&top.content, &PRICE_CONTENT_KEYWORDS)
        {
            return vec![top];
        }
    }

    Vec::new()
}

fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

/// Render the context block around the verbatim question.
pub fn render_prompt(selected: &[&ScoredSnippet], question: &str) -> String {
    let mut out = String::new();
    out.push_str(CONTEXT_PREFACE);
    out.push_str("\n\nContexto:\n");
    for snippet in selected {
        out.push_str("- ");
        out.push_str(&truncate_chars(snippet.content.trim(), SNIPPET_MAX_CHARS));
        out.push('\n');
    }
    out.push_str("\nPergunta do usuário:\n");
    out.push_str(question);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(pairs: &[(&str, f32)]) -> Vec<ScoredSnippet> {
        let mut out: Vec<ScoredSnippet> = pairs
            .iter()
            .map(|(content, score)| ScoredSnippet {
                content: content.to_string(),
                score: *score,
            })
            .collect();
        out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        out
    }

    #[test]
    fn score_exactly_at_threshold_is_selected() {
        let snippets = scored(&[("horário de atendimento", 0.55)]);
        let selected = select_snippets(&snippets, 4, 0.55, "qual o horário?");
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn score_just_below_threshold_is_not_selected() {
        let snippets = scored(&[("horário de atendimento", 0.54)]);
        let selected = select_snippets(&snippets, 4, 0.55, "qual o horário?");
        assert!(selected.is_empty());
    }

    #[test]
    fn top_k_caps_the_selection_in_descending_order() {
        let snippets = scored(&[("a", 0.9), ("b", 0.8), ("c", 0.7), ("d", 0.6)]);
        let selected = select_snippets(&snippets, 2, 0.55, "pergunta");
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].content, "a");
        assert_eq!(selected[1].content, "b");
    }

    #[test]
    fn price_fallback_rescues_the_top_snippet() {
        let snippets = scored(&[("Plano Básico custa R$ 99/mês", 0.48)]);
        let selected = select_snippets(&snippets, 4, 0.55, "quanto custa o plano?");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].content, "Plano Básico custa R$ 99/mês");
    }

    #[test]
    fn price_fallback_requires_all_four_conditions() {
        // Question without price keywords.
        let priced = scored(&[("Plano Básico custa R$ 99/mês", 0.48)]);
        assert!(select_snippets(&priced, 4, 0.55, "qual o horário?").is_empty());

        // Top score below the relaxed floor.
        let weak = scored(&[("Plano Básico custa R$ 99/mês", 0.39)]);
        assert!(select_snippets(&weak, 4, 0.55, "quanto custa o plano?").is_empty());

        // Snippet content without pricing markers.
        let unrelated = scored(&[("atendemos de segunda a sexta", 0.48)]);
        assert!(select_snippets(&unrelated, 4, 0.55, "quanto custa o plano?").is_empty());

        // Non-empty selection wins over the fallback path.
        let mixed = scored(&[("horário de atendimento", 0.7), ("Plano custa R$ 99", 0.48)]);
        let selected = select_snippets(&mixed, 4, 0.55, "quanto custa o plano?");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].content, "horário de atendimento");
    }

    #[test]
    fn fallback_score_exactly_at_floor_applies() {
        let snippets = scored(&[("valor do plano: R$ 99", 0.40)]);
        let selected = select_snippets(&snippets, 4, 0.55, "qual o valor?");
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn prompt_wraps_snippets_around_the_question() {
        let snippets = scored(&[("Plano Básico custa R$ 99/mês", 0.9)]);
        let selected = select_snippets(&snippets, 4, 0.55, "quanto custa?");
        let prompt = render_prompt(&selected, "quanto custa?");

        assert!(prompt.starts_with(CONTEXT_PREFACE));
        assert!(prompt.contains("- Plano Básico custa R$ 99/mês"));
        assert!(prompt.ends_with("Pergunta do usuário:\nquanto custa?"));
    }

    #[test]
    fn prompt_truncates_long_snippets() {
        let long = "x".repeat(700);
        let snippets = scored(&[(long.as_str(), 0.9)]);
        let selected = select_snippets(&snippets, 4, 0.55, "pergunta");
        let prompt = render_prompt(&selected, "pergunta");

        assert!(prompt.contains(&format!("- {}…", "x".repeat(600))));
        assert!(!prompt.contains(&"x".repeat(601)));
    }

    #[test]
    fn scoring_skips_undecodable_snippets() {
        let snippets = vec![
            KnowledgeSnippet {
                id: 1,
                tenant_id: 1,
                category_id: 1,
                content: "ok".to_string(),
                embedding: "[1.0, 0.0]".to_string(),
            },
            KnowledgeSnippet {
                id: 2,
                tenant_id: 1,
                category_id: 2,
                content: "quebrado".to_string(),
                embedding: "not json".to_string(),
            },
            KnowledgeSnippet {
                id: 3,
                tenant_id: 1,
                category_id: 3,
                content: "norma zero".to_string(),
                embedding: "[0.0, 0.0]".to_string(),
            },
        ];
        let scored = score_snippets(&[1.0, 0.0], snippets);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].content, "ok");
        assert!((scored[0].score - 1.0).abs() < 1e-6);
    }
}
