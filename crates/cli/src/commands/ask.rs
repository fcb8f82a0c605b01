//! `docbot ask`: Interactive or single-question mode.

use std::io::Write;

use docbot_agent::RagAssistant;
use docbot_channels::CliChannel;
use docbot_config::AppConfig;
use docbot_core::channel::Channel;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let retriever = super::build_retriever(&config)?;

    // Check credentials early for a clear error
    let Some(assistant) = super::build_assistant(&config, retriever) else {
        eprintln!();
        eprintln!("  ERROR: Yandex GPT is not configured!");
        eprintln!();
        eprintln!("  Set these environment variables:");
        eprintln!("    export YANDEX_API_KEY='...'");
        eprintln!("    export YANDEX_FOLDER_ID='b1g...'");
        eprintln!();
        eprintln!("  Or add them to the [assistant] section of:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("Assistant not configured. See above for setup instructions.".into());
    };

    if let Some(question) = message {
        eprint!("  Думаю над ответом...");
        let result = assistant.answer(&question).await;
        eprint!("\r                      \r");
        println!("{}", result?.answer);
        return Ok(());
    }

    println!();
    println!("  DocBot: Interactive Mode");
    println!();
    println!("  Provider:  {}", assistant.provider_name());
    println!("  Model:     {}", config.assistant.model);
    println!("  Docs:      {}", config.retrieval.docs_dir.display());
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let channel = CliChannel::new();
    let mut rx = channel.start().await.map_err(|e| format!("Channel error: {e}"))?;

    prompt()?;
    while let Some(result) = rx.recv().await {
        match result {
            Ok(msg) => {
                answer_one(&assistant, &channel, &msg.content).await;
                prompt()?;
            }
            Err(e) => {
                eprintln!("  [Channel Error] {e}");
                break;
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

async fn answer_one(assistant: &RagAssistant, channel: &CliChannel, question: &str) {
    eprint!("  ...");
    match assistant.answer(question).await {
        Ok(answer) => {
            eprint!("\r     \r");
            if answer.retrieval.fallback {
                eprintln!("  (no document matched; answering from the whole corpus)");
            }
            let _ = channel.send("cli_session", &answer.answer, None).await;
        }
        Err(e) => {
            eprint!("\r     \r");
            eprintln!("  [Error] {e}");
            println!();
        }
    }
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
