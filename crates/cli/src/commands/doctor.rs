//! `docbot doctor`: diagnose configuration and connectivity.

use docbot_channels::TelegramChannel;
use docbot_config::AppConfig;
use docbot_core::channel::Channel;
use docbot_core::document::DocumentStore;
use docbot_core::history::HistoryStore;
use docbot_history::SqliteHistory;
use docbot_retrieval::DirectoryStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 DocBot Doctor: System Diagnostics");
    println!("====================================\n");

    let mut issues = 0;

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    // Corpus
    let r = &config.retrieval;
    if r.docs_dir.is_dir() {
        let store = DirectoryStore::new(&r.docs_dir).with_extensions(&r.extensions);
        let count = tokio::task::spawn_blocking(move || store.load_documents().len()).await?;
        if count > 0 {
            println!("  ✅ {count} document(s) in {}", r.docs_dir.display());
        } else {
            println!("  ⚠️  Docs directory is empty: {}", r.docs_dir.display());
            issues += 1;
        }
    } else {
        println!("  ❌ Docs directory missing: {} (run `docbot onboard`)", r.docs_dir.display());
        issues += 1;
    }

    // Completion credentials
    if config.assistant.is_configured() {
        println!("  ✅ Yandex GPT credentials configured");
    } else {
        println!("  ⚠️  YANDEX_API_KEY / YANDEX_FOLDER_ID not set");
        issues += 1;
    }

    // Telegram
    match TelegramChannel::from_config(&config.telegram) {
        Ok(channel) => match channel.health_check().await {
            Ok(true) => println!("  ✅ Telegram bot token accepted"),
            Ok(false) => {
                println!("  ⚠️  Telegram token does not belong to a bot");
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Telegram getMe failed: {e}");
                issues += 1;
            }
        },
        Err(_) => {
            println!("  ⚠️  BOT_TOKEN not set");
            issues += 1;
        }
    }

    // History
    match SqliteHistory::new(&config.history.database_path).await {
        Ok(history) => match history.count_exchanges().await {
            Ok(n) => println!("  ✅ History database ok ({n} exchange(s))"),
            Err(e) => {
                println!("  ❌ History query failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ History database unavailable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
