//! Scripted provider for development & testing
//! Keeps the pipeline functional without network access

use crate::error::NavigatorError;
use crate::llm::LlmProvider;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Reply = std::result::Result<String, String>;

/// Replays a script of replies in order; the last reply repeats forever.
pub struct MockProvider {
    name: String,
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn scripted(name: &str, replies: Vec<Reply>) -> Self {
        let mut script: VecDeque<Reply> = replies.into();
        let last = script
            .back()
            .cloned()
            .unwrap_or_else(|| Err("mock provider has no script".to_string()));

        // Keep the final reply out of the queue so it can repeat
        script.pop_back();

        Self {
            name: name.to_string(),
            script: Mutex::new(script),
            last: Mutex::new(last),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn replying(name: &str, text: &str) -> Self {
        Self::scripted(name, vec![Ok(text.to_string())])
    }

    pub fn failing(name: &str, error: &str) -> Self {
        Self::scripted(name, vec![Err(error.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt this provider has received, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> Reply {
        let queued = self.script.lock().ok().and_then(|mut s| s.pop_front());

        match queued {
            Some(reply) => reply,
            None => self
                .last
                .lock()
                .map(|r| r.clone())
                .unwrap_or_else(|_| Err("mock provider poisoned".to_string())),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        self.next_reply()
            .map_err(|message| NavigatorError::provider(&self.name, message))
    }
}
