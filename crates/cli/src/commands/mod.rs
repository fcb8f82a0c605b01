//! Subcommand implementations and the wiring they share.

pub mod ask;
pub mod bot;
pub mod context;
pub mod doctor;
pub mod onboard;
pub mod status;

use std::sync::Arc;

use docbot_agent::RagAssistant;
use docbot_config::AppConfig;
use docbot_providers::YandexGptProvider;
use docbot_retrieval::ContextAssembler;

/// Load config from `~/.docbot/config.toml` plus environment overrides.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The retrieval engine over the configured docs folder.
pub fn build_retriever(config: &AppConfig) -> Result<Arc<ContextAssembler>, Box<dyn std::error::Error>> {
    let assembler = ContextAssembler::from_config(&config.retrieval)
        .map_err(|e| format!("Invalid retrieval.term_pattern: {e}"))?;
    Ok(Arc::new(assembler))
}

/// The assistant, or `None` when completion credentials are missing.
pub fn build_assistant(
    config: &AppConfig,
    retriever: Arc<ContextAssembler>,
) -> Option<Arc<RagAssistant>> {
    let provider = YandexGptProvider::from_config(&config.assistant)?;
    Some(Arc::new(RagAssistant::from_config(
        &config.assistant,
        Arc::new(provider),
        retriever,
    )))
}
