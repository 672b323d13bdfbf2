//! OpenAI chat completions provider

use crate::error::NavigatorError;
use crate::llm::{http_client, LlmProvider};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const PROVIDER_NAME: &str = "OpenAI";
const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            temperature: 0.7,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        debug!(model = %self.model, "Calling OpenAI API");

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NavigatorError::provider(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error response: {}", error_text);
            return Err(NavigatorError::provider(
                PROVIDER_NAME,
                format!("{}: {}", status, error_text),
            ));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            NavigatorError::provider(PROVIDER_NAME, format!("parse error: {}", e))
        })?;

        body.into_text()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| NavigatorError::provider(PROVIDER_NAME, "Empty response from OpenAI"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_response() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Pay 386.66 a month."},"finish_reason":"stop"}]}"#;
        let body: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.into_text().unwrap(), "Pay 386.66 a month.");
    }

    #[test]
    fn test_null_content_is_error() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let body: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(body.into_text().is_err());
    }
}
