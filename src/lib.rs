// src/lib.rs
// Penélope backend - multi-tenant WhatsApp chatbot (message-turn pipeline)

pub mod api;
pub mod config;
pub mod db;
pub mod guardrails;
pub mod history;
pub mod llm;
pub mod models;
pub mod outbound;
pub mod rag;
pub mod state;
pub mod utils;
pub mod workers;
