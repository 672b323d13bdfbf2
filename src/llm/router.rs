//! Ordered fallback router over LLM providers
//!
//! Tries providers strictly in chain order, one request at a time.
//! Callers only ever see the final aggregate failure.

use crate::error::NavigatorError;
use crate::llm::{classify_failure, prompt_fingerprint, ProviderSpec};
use crate::Result;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

const STATUS_PROBE_PROMPT: &str = "Hello";

pub struct LlmRouter {
    chain: Vec<ProviderSpec>,
    /// Providers left out at startup, reported by `status` only
    unconfigured: Vec<String>,
}

impl LlmRouter {
    /// Build a router over a fixed chain. An empty chain is rejected here,
    /// before any request can be attempted.
    pub fn new(chain: Vec<ProviderSpec>) -> Result<Self> {
        if chain.is_empty() {
            return Err(NavigatorError::NoProviders);
        }

        info!(
            providers = ?chain.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "LLM fallback chain configured"
        );

        Ok(Self {
            chain,
            unconfigured: Vec::new(),
        })
    }

    pub fn with_unconfigured(mut self, names: Vec<String>) -> Self {
        self.unconfigured = names;
        self
    }

    /// Invoke `prompt` against the chain.
    ///
    /// Fails only once every provider has been tried, with the last
    /// provider's error attached.
    pub async fn invoke(&self, prompt: &str) -> Result<String> {
        let prompt_fp = prompt_fingerprint(prompt);
        let mut last_failure: Option<(String, String)> = None;

        for spec in &self.chain {
            let provider = spec.name();
            let max_attempts = spec.retry.max_attempts.max(1);

            for attempt in 0..max_attempts {
                debug!(
                    provider,
                    attempt = attempt + 1,
                    prompt_fp = %prompt_fp,
                    "Invoking LLM provider"
                );

                match spec.provider.invoke(prompt).await {
                    Ok(text) => {
                        info!(provider, attempt = attempt + 1, "LLM provider succeeded");
                        return Ok(text);
                    }
                    Err(e) => {
                        let message = e.to_string();
                        let class = classify_failure(&message);

                        warn!(
                            provider,
                            attempt = attempt + 1,
                            class = ?class,
                            error = %message,
                            "LLM provider failed"
                        );

                        last_failure = Some((provider.to_string(), message));

                        if !spec.should_retry(class) {
                            debug!(provider, "Moving to next provider");
                            break;
                        }

                        if attempt + 1 < max_attempts {
                            let delay = spec.retry.backoff_for(attempt);
                            debug!(provider, delay_ms = delay.as_millis() as u64, "Backing off");
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        let (provider, last_error) = last_failure.ok_or(NavigatorError::NoProviders)?;

        warn!(provider = %provider, prompt_fp = %prompt_fp, "All LLM providers exhausted");

        Err(NavigatorError::AllProvidersExhausted {
            provider,
            last_error,
        })
    }

    /// Probe every provider once, without retries.
    pub async fn status(&self) -> Map<String, Value> {
        let mut status = Map::new();

        for spec in &self.chain {
            let state = match spec.provider.invoke(STATUS_PROBE_PROMPT).await {
                Ok(_) => "Available".to_string(),
                Err(e) => {
                    let message: String = e.to_string().chars().take(50).collect();
                    format!("Unavailable: {}...", message)
                }
            };
            status.insert(spec.name().to_string(), Value::String(state));
        }

        for name in &self.unconfigured {
            status.insert(name.clone(), Value::String("Not configured".to_string()));
        }

        status
    }
}
