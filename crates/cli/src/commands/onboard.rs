//! `docbot onboard`: first-time setup.

use docbot_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("📚 DocBot: First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    // Env overrides apply, so DOCBOT_DOCS_DIR picks the folder to create.
    let mut config = AppConfig::default();
    config.apply_env_overrides(|key| std::env::var(key).ok());
    let docs_dir = &config.retrieval.docs_dir;
    if !docs_dir.exists() {
        std::fs::create_dir_all(docs_dir)?;
        println!("✅ Created docs directory: {}", docs_dir.display());
    } else {
        println!("  Docs directory exists: {}", docs_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Put your .txt documentation into {}", docs_dir.display());
        println!("   2. export YANDEX_API_KEY=... YANDEX_FOLDER_ID=... BOT_TOKEN=...");
        println!("   3. Run: docbot doctor, then docbot bot\n");
    }

    println!("🎉 Setup complete!\n");
    Ok(())
}
