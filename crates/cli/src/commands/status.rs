//! `docbot status`: show configuration status.

use docbot_config::AppConfig;
use docbot_core::document::DocumentStore;
use docbot_retrieval::DirectoryStore;

fn presence(value: &Option<String>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "set",
        _ => "missing",
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let r = &config.retrieval;

    let store = DirectoryStore::new(&r.docs_dir).with_extensions(&r.extensions);
    let documents = tokio::task::spawn_blocking(move || store.load_documents().len()).await?;

    println!("📚 DocBot Status");
    println!("================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Docs dir:      {} ({documents} document(s))", r.docs_dir.display());
    println!("  Extensions:    {}", r.extensions.join(", "));
    println!("  Budget:        {} chars, top {}", r.max_context_chars, r.top_k);
    println!("  Model:         {}", config.assistant.model);
    println!("  Temperature:   {}", config.assistant.temperature);
    println!("  Max tokens:    {}", config.assistant.max_tokens);
    println!("  API key:       {}", presence(&config.assistant.api_key));
    println!("  Folder id:     {}", presence(&config.assistant.folder_id));
    println!("  Bot token:     {}", presence(&config.telegram.bot_token));
    println!("  History:       {}", config.history.database_path);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, using defaults (run `docbot onboard`)");
    }

    Ok(())
}
