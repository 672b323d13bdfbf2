//! Debt Navigator
//!
//! A personal-finance assistant that:
//! - Answers natural-language debt questions
//! - Computes payoff schedules and fixed payments exactly (LLM excluded from the math)
//! - Routes model calls across an ordered provider chain with retry and fallback
//! - Falls back to CSV-backed document answers for non-calculation questions
//! - Serves calculator and debt-record endpoints over HTTP
//!
//! ASK PIPELINE:
//! QUESTION → EXTRACT → CALCULATE → COMPOSE
//!               ↓ (not extractable)
//!           TOPIC FILTER → DOCUMENTS

pub mod amortization;
pub mod api;
pub mod classifier;
pub mod composer;
pub mod config;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod retrieval;
pub mod store;

pub use error::{NavigatorError, Result};

// Re-export common types
pub use models::*;
pub use classifier::{OffTopicPolicy, TopicClass, TopicClassifier};
pub use orchestrator::{AnswerSource, QuestionRouter, RoutedAnswer};
