//! LLM provider capability and fallback routing
//!
//! A provider is anything that turns a prompt into text or fails with a
//! descriptive error. Providers are arranged in a fixed, ordered chain at
//! startup and [`LlmRouter`] walks that chain per request.

use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod router;

pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use router::LlmRouter;

/// Capability interface every backend implements
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Identifier used in logs and status reports (e.g. "Gemini")
    fn name(&self) -> &str;

    async fn invoke(&self, prompt: &str) -> Result<String>;
}

/// Where a provider runs. Decides whether unclassified failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Remote API; any failure advances the chain
    Hosted,
    /// Self-hosted model; transient failures are retried with backoff
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    RateLimited,
    Transient,
}

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "quota",
    "limit exceeded",
    "429",
    "too many requests",
    "usage limit",
];

/// Map raw error text to a failure class.
///
/// Anything without a rate-limit marker is treated as transient. A missed
/// marker costs at most the provider's remaining retry budget.
pub fn classify_failure(error_text: &str) -> FailureClass {
    let lowered = error_text.to_lowercase();

    if RATE_LIMIT_MARKERS.iter().any(|m| lowered.contains(m)) {
        FailureClass::RateLimited
    } else {
        FailureClass::Transient
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Delay after the failed attempt with zero-based index `attempt`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}

/// One link of the fallback chain
#[derive(Clone)]
pub struct ProviderSpec {
    pub provider: Arc<dyn LlmProvider>,
    pub kind: ProviderKind,
    pub retry: RetryPolicy,
}

impl ProviderSpec {
    pub fn new(provider: Arc<dyn LlmProvider>, kind: ProviderKind, retry: RetryPolicy) -> Self {
        Self {
            provider,
            kind,
            retry,
        }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Only a local provider failing for a non-rate-limit reason is retried.
    pub fn should_retry(&self, class: FailureClass) -> bool {
        self.kind == ProviderKind::Local && class == FailureClass::Transient
    }
}

impl std::fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("provider", &self.name())
            .field("kind", &self.kind)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Short stable digest of a prompt, logged instead of the prompt itself
pub fn prompt_fingerprint(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    hex::encode(&digest[..6])
}

/// Connection-pooled HTTP client shared by the live providers
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(8)
        .timeout(timeout)
        .build()?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit_markers() {
        let cases = [
            "429 Too Many Requests",
            "Rate limit reached for gpt-3.5-turbo",
            "You exceeded your current quota, please check your plan",
            "Daily usage limit hit",
            "RESOURCE_EXHAUSTED: limit exceeded for model",
        ];

        for c in cases {
            assert_eq!(classify_failure(c), FailureClass::RateLimited, "{}", c);
        }
    }

    #[test]
    fn test_classify_defaults_to_transient() {
        assert_eq!(
            classify_failure("error sending request for url (http://localhost:11434/api/generate)"),
            FailureClass::Transient
        );
        assert_eq!(classify_failure(""), FailureClass::Transient);
        assert_eq!(
            classify_failure("500 Internal Server Error"),
            FailureClass::Transient
        );
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(250));
        assert_eq!(policy.backoff_for(0), Duration::from_millis(250));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_retry_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_should_retry_only_local_transient() {
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::replying("m", "ok"));
        let hosted = ProviderSpec::new(provider.clone(), ProviderKind::Hosted, RetryPolicy::default());
        let local = ProviderSpec::new(provider, ProviderKind::Local, RetryPolicy::default());

        assert!(!hosted.should_retry(FailureClass::Transient));
        assert!(!hosted.should_retry(FailureClass::RateLimited));
        assert!(local.should_retry(FailureClass::Transient));
        assert!(!local.should_retry(FailureClass::RateLimited));
    }

    #[test]
    fn test_prompt_fingerprint_is_stable() {
        let a = prompt_fingerprint("How long to pay off 5000?");
        assert_eq!(a.len(), 12);
        assert_eq!(a, prompt_fingerprint("How long to pay off 5000?"));
        assert_ne!(a, prompt_fingerprint("How long to pay off 6000?"));
    }
}
