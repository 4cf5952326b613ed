//! Mock completion client for testing.

use super::{CompletionClient, CompletionError, CompletionParams};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A prompt pair as received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
    pub params: CompletionParams,
}

/// Completion client that replies with a scripted result and records calls.
pub struct MockCompletionClient {
    reply: Result<String, CompletionError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<RecordedPrompt>>,
}

impl MockCompletionClient {
    /// Always reply with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_result(Ok(text.into()))
    }

    /// Always fail with `error`.
    pub fn failing(error: CompletionError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(reply: Result<String, CompletionError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    pub fn last_prompt(&self) -> Option<RecordedPrompt> {
        self.prompts().pop()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(RecordedPrompt {
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
                params: *params,
            });
        }

        self.reply.clone()
    }
}
