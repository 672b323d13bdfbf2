//! Startup configuration from environment variables
//!
//! Read once in the binaries after `dotenv`; nothing reads the environment
//! after startup.

use crate::classifier::OffTopicPolicy;
use crate::composer::AnswerStyle;
use crate::error::NavigatorError;
use crate::llm::{
    GeminiProvider, LlmProvider, OllamaProvider, OpenAiProvider, ProviderKind, ProviderSpec,
    RetryPolicy,
};
use crate::retrieval::DEFAULT_CHUNK_ROWS;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost,http://localhost:3000";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub ollama_enabled: bool,
    pub ollama_model: String,
    pub ollama_base_url: String,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: Option<String>,
    pub documents_csv: Option<PathBuf>,
    pub documents_chunk_rows: usize,
    pub answer_style: AnswerStyle,
    pub off_topic_policy: OffTopicPolicy,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_value("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let answer_style = match get("ANSWER_STYLE") {
            Some(raw) => raw.parse()?,
            None => AnswerStyle::Llm,
        };

        let off_topic_policy = match get("OFF_TOPIC_POLICY") {
            Some(raw) => raw.parse()?,
            None => OffTopicPolicy::Refuse,
        };

        let llm = LlmConfig {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".into()),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".into()),
            ollama_enabled: match get("OLLAMA_ENABLED") {
                Some(raw) => parse_bool("OLLAMA_ENABLED", &raw)?,
                None => true,
            },
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| "llama3.1:8b".into()),
            ollama_base_url: get("OLLAMA_BASE_URL")
                .unwrap_or_else(|| "http://localhost:11434".into()),
            max_attempts: match get("LLM_MAX_ATTEMPTS") {
                Some(raw) => parse_value("LLM_MAX_ATTEMPTS", &raw)?,
                None => 2,
            },
            initial_backoff: Duration::from_millis(match get("LLM_BACKOFF_MS") {
                Some(raw) => parse_value("LLM_BACKOFF_MS", &raw)?,
                None => 1000,
            }),
            timeout: Duration::from_secs(match get("LLM_TIMEOUT_SECS") {
                Some(raw) => parse_value("LLM_TIMEOUT_SECS", &raw)?,
                None => 60,
            }),
        };

        Ok(Self {
            port,
            cors_origins,
            database_url: get("DATABASE_URL").or_else(|| get("POSTGRES_URL")),
            documents_csv: get("DOCUMENTS_CSV").map(PathBuf::from),
            documents_chunk_rows: match get("DOCUMENTS_CHUNK_ROWS") {
                Some(raw) => parse_value("DOCUMENTS_CHUNK_ROWS", &raw)?,
                None => DEFAULT_CHUNK_ROWS,
            },
            answer_style,
            off_topic_policy,
            llm,
        })
    }
}

impl LlmConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.initial_backoff)
    }

    /// Chain members left out for lack of configuration, in chain order
    pub fn unconfigured_providers(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.gemini_api_key.is_none() {
            names.push("Gemini".to_string());
        }
        if self.openai_api_key.is_none() {
            names.push("OpenAI".to_string());
        }
        if !self.ollama_enabled {
            names.push("Ollama".to_string());
        }
        names
    }

    /// Fixed order: Gemini, OpenAI, Ollama. Unconfigured providers are skipped.
    pub fn build_provider_chain(&self) -> Result<Vec<ProviderSpec>> {
        let retry = self.retry_policy();
        let mut chain = Vec::new();

        if let Some(key) = &self.gemini_api_key {
            let provider: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(
                key.clone(),
                self.gemini_model.clone(),
                self.timeout,
            )?);
            chain.push(ProviderSpec::new(provider, ProviderKind::Hosted, retry));
        }

        if let Some(key) = &self.openai_api_key {
            let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
                key.clone(),
                self.openai_model.clone(),
                self.timeout,
            )?);
            chain.push(ProviderSpec::new(provider, ProviderKind::Hosted, retry));
        }

        if self.ollama_enabled {
            let provider: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::new(
                self.ollama_base_url.clone(),
                self.ollama_model.clone(),
                self.timeout,
            )?);
            chain.push(ProviderSpec::new(provider, ProviderKind::Local, retry));
        }

        info!(
            providers = ?chain.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Built LLM provider chain"
        );

        Ok(chain)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| NavigatorError::Config(format!("invalid value for {}: '{}'", key, raw)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(NavigatorError::Config(format!(
            "invalid value for {}: '{}'",
            key, raw
        ))),
    }
}
