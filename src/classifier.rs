//! Topic Classifier
//!
//! Decides whether a question that could not be turned into a calculation
//! is still a finance question worth answering from documents.

use crate::error::NavigatorError;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicClass {
    Finance,
    OffTopic,
}

/// Static keyword list, matched as case-insensitive substrings
pub const FINANCE_KEYWORDS: &[&str] = &[
    // Lending
    "loan", "interest", "payment", "debt", "credit", "mortgage", "student loan",
    // General finance
    "finance", "financial", "money", "budget", "tax",
    // Markets
    "invest", "market", "stock",
    // Uploaded data
    "total sl", "csv data", "loan data",
];

pub const OFF_TOPIC_REPLY: &str = "I am a specialized financial assistant. My knowledge is focused on topics like loans, debt, and financial calculations based on the provided data. Please ask me a finance-related question.";

/// What to do with a question that is neither a calculation nor finance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffTopicPolicy {
    /// Reply with [`OFF_TOPIC_REPLY`] without calling a model
    Refuse,
    /// Answer through the model chain as a general assistant
    Converse,
}

impl FromStr for OffTopicPolicy {
    type Err = NavigatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "refuse" => Ok(Self::Refuse),
            "converse" => Ok(Self::Converse),
            other => Err(NavigatorError::Config(format!(
                "unknown off-topic policy '{}', expected 'refuse' or 'converse'",
                other
            ))),
        }
    }
}

pub struct TopicClassifier;

impl TopicClassifier {
    pub fn classify(question: &str) -> TopicClass {
        if is_finance_topic(question) {
            TopicClass::Finance
        } else {
            TopicClass::OffTopic
        }
    }
}

pub fn is_finance_topic(question: &str) -> bool {
    let lowered = question.to_lowercase();
    FINANCE_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}
