//! Error types for the debt navigator

use thiserror::Error;

/// Result type alias for navigator operations
pub type Result<T> = std::result::Result<T, NavigatorError>;

#[derive(Error, Debug)]
pub enum NavigatorError {

    // =============================
    // Request Errors
    // =============================

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // =============================
    // LLM Pipeline Errors
    // =============================

    /// A single provider attempt failed. The message is what the
    /// failure classifier inspects.
    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },

    #[error("No LLM providers configured")]
    NoProviders,

    #[error("All available LLMs failed. Last error from {provider}: {last_error}")]
    AllProvidersExhausted { provider: String, last_error: String },

    // =============================
    // Infrastructure Errors
    // =============================

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl NavigatorError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// True for faults that should surface as a server error rather than
    /// a structured answer.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }
}
