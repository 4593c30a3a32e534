// src/guardrails.rs
// Pre-model guardrail: never improvise answers about the product or its
// pricing. A business-flavored question with no tenant context gets a
// clarification request instead of a model call.

/// Canned reply when a business question arrives without tenant context.
pub const CLARIFICATION_REPLY: &str =
    "Entendi em partes, consegue me explicar com um pouco mais de detalhe? :)";

/// Canned reply when the model call fails or the worker deadline expires.
pub const MODEL_FAILURE_REPLY: &str = "Desculpe, tive um problema ao gerar a resposta.";

const BUSINESS_KEYWORDS: [&str; 15] = [
    "penelope",
    "penélope",
    "chatbot",
    "plano",
    "planos",
    "bot",
    "chat bot",
    "preço",
    "preco",
    "custo",
    "custa",
    "valor",
    "mensal",
    "mensalidade",
    "assinatura",
];

/// True when the reply pipeline should short-circuit with
/// [`CLARIFICATION_REPLY`]: RAG selected nothing AND the question mentions
/// the product, plans or pricing.
pub fn needs_clarification(question: &str, rag_selected: usize) -> bool {
    rag_selected == 0 && mentions_business(question)
}

fn mentions_business(question: &str) -> bool {
    let lowered = question.to_lowercase();
    BUSINESS_KEYWORDS.iter().any(|k| lowered.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_question_without_context_asks_for_clarification() {
        assert!(needs_clarification("qual o preço do chatbot?", 0));
        assert!(needs_clarification("Quanto é a MENSALIDADE?", 0));
        assert!(needs_clarification("a penélope faz isso?", 0));
    }

    #[test]
    fn context_disables_the_guardrail() {
        assert!(!needs_clarification("qual o preço do chatbot?", 1));
    }

    #[test]
    fn ordinary_questions_pass_through() {
        assert!(!needs_clarification("qual o horário de atendimento?", 0));
        assert!(!needs_clarification("vocês atendem aos sábados?", 0));
    }

    #[test]
    fn clarification_reply_is_the_exact_literal() {
        assert_eq!(
            CLARIFICATION_REPLY,
            "Entendi em partes, consegue me explicar com um pouco mais de detalhe? :)"
        );
    }
}
