//! Shared test helpers for pattern tests.

use docbot_core::error::ProviderError;
use docbot_core::message::Message;
use docbot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns one scripted outcome and records every request.
pub struct RecordingProvider {
    outcome: Result<ProviderResponse, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

impl RecordingProvider {
    /// Create a provider that always answers with `text`.
    pub fn single_text(text: &str) -> Self {
        Self {
            outcome: Ok(make_text_response(text)),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Create a provider that always fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            outcome: Err(error),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep for `delay` before answering, like a slow completion.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}
