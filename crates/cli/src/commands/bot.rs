//! `docbot bot`: Run the Telegram bot.

use std::sync::Arc;

use docbot_agent::BotHandler;
use docbot_channels::TelegramChannel;
use docbot_core::channel::Channel;
use docbot_history::SqliteHistory;
use tracing::{info, warn};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    let channel = TelegramChannel::from_config(&config.telegram).map_err(|e| {
        format!("{e}. Set BOT_TOKEN or telegram.bot_token in config.toml")
    })?;
    let channel: Arc<dyn Channel> = Arc::new(channel);

    let retriever = super::build_retriever(&config)?;
    let assistant = super::build_assistant(&config, retriever);
    if assistant.is_none() {
        warn!("YANDEX_API_KEY / YANDEX_FOLDER_ID not set; questions will get a setup hint");
    }

    let history = SqliteHistory::new(&config.history.database_path)
        .await
        .map_err(|e| format!("History database: {e}"))?;

    let handler = Arc::new(BotHandler::new(assistant, Arc::new(history)));

    info!(
        docs_dir = %config.retrieval.docs_dir.display(),
        database = %config.history.database_path,
        "DocBot starting"
    );

    let mut serving = tokio::spawn(handler.serve(Arc::clone(&channel)));
    tokio::select! {
        served = &mut serving => served??,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down; finishing in-flight answers");
            channel.stop().await?;
            serving.await??;
        }
    }

    info!("DocBot stopped");
    Ok(())
}
