//! RAG pattern: Retrieval-Augmented Generation over the documentation corpus.
//!
//! # Flow
//!
//! 1. Receive a user question
//! 2. Assemble the documentation context (blocking file I/O, off the runtime)
//! 3. Build `[system: prompt + context, user: question]`
//! 4. Ask the provider for a single completion
//! 5. Return the answer with a report of which documents were used

use std::sync::Arc;

use docbot_config::AssistantConfig;
use docbot_core::message::Message;
use docbot_core::provider::{Provider, ProviderRequest, Usage};
use docbot_retrieval::{ContextAssembler, Retrieval};
use serde::Serialize;
use tracing::{debug, info};

/// Answers questions from the documentation corpus.
pub struct RagAssistant {
    /// Completion backend.
    provider: Arc<dyn Provider>,
    /// Retrieval engine.
    retriever: Arc<ContextAssembler>,
    /// Model name passed to the provider.
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    /// Instruction placed before the retrieved context.
    system_prompt: String,
}

/// Result of answering one question.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    /// The generated answer text.
    pub answer: String,
    /// What the retrieval step put into the prompt.
    pub retrieval: Retrieval,
    /// Token usage reported by the provider, if any.
    pub usage: Option<Usage>,
}

impl RagAssistant {
    /// Create an assistant with the default generation settings.
    pub fn new(
        provider: Arc<dyn Provider>,
        retriever: Arc<ContextAssembler>,
        model: impl Into<String>,
    ) -> Self {
        let defaults = AssistantConfig::default();
        Self {
            provider,
            retriever,
            model: model.into(),
            temperature: defaults.temperature,
            max_tokens: Some(defaults.max_tokens),
            system_prompt: defaults.system_prompt,
        }
    }

    /// Create an assistant with model, sampling and prompt taken from config.
    pub fn from_config(
        config: &AssistantConfig,
        provider: Arc<dyn Provider>,
        retriever: Arc<ContextAssembler>,
    ) -> Self {
        Self {
            provider,
            retriever,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            system_prompt: config.system_prompt.clone(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn retriever(&self) -> &ContextAssembler {
        &self.retriever
    }

    /// The system instruction for a given context.
    pub fn system_message(&self, context: &str) -> String {
        format!("{}\n\n{}", self.system_prompt, context)
    }

    /// `[system: prompt + context, user: question]`
    pub fn build_messages(&self, question: &str, context: &str) -> Vec<Message> {
        vec![
            Message::system(self.system_message(context)),
            Message::user(question),
        ]
    }

    /// The provider request for a question and its retrieved context.
    pub fn build_request(&self, question: &str, context: &str) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: self.build_messages(question, context),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Run retrieval for `question` on the blocking pool.
    pub async fn retrieve(&self, question: &str) -> Result<Retrieval, docbot_core::Error> {
        let retriever = Arc::clone(&self.retriever);
        let question = question.to_string();
        tokio::task::spawn_blocking(move || retriever.retrieve_default(&question))
            .await
            .map_err(|e| docbot_core::Error::Internal(format!("Retrieval task failed: {e}")))
    }

    /// Answer a question grounded in the documentation.
    pub async fn answer(&self, question: &str) -> Result<RagAnswer, docbot_core::Error> {
        info!(model = %self.model, provider = self.provider.name(), "RAG: starting retrieval");

        let retrieval = self.retrieve(question).await?;
        debug!(
            excerpts = retrieval.excerpts.len(),
            fallback = retrieval.fallback,
            context_chars = retrieval.context.chars().count(),
            "RAG: context assembled"
        );

        let request = self.build_request(question, &retrieval.context);
        let response = self.provider.complete(request).await?;
        let answer = response.message.content;

        info!(
            excerpts = retrieval.excerpts.len(),
            answer_len = answer.len(),
            "RAG: response generated"
        );

        Ok(RagAnswer {
            answer,
            retrieval,
            usage: response.usage,
        })
    }
}

impl std::fmt::Debug for RagAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagAssistant")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
