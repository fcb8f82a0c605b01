//! DocBot CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write the default config and create the docs folder
//! - `bot`: Run the Telegram bot
//! - `ask`: Ask a question from the terminal
//! - `context`: Show the documentation context for a question (no LLM)
//! - `status`: Show configuration status
//! - `doctor`: Diagnose configuration and connectivity

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "docbot",
    about = "DocBot: answers developer questions from a documentation folder",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "DOCBOT_LOG_JSON")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and create the docs folder
    Onboard,

    /// Run the Telegram bot (long polling)
    Bot,

    /// Ask the assistant a question
    Ask {
        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Print the documentation context retrieved for a question
    Context {
        /// The question to retrieve context for
        question: String,

        /// Number of top-ranked documents to consider
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print a JSON report instead of the raw context
        #[arg(long)]
        report: bool,
    },

    /// Show configuration status
    Status,

    /// Diagnose configuration and connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Bot => commands::bot::run().await?,
        Commands::Ask { message } => commands::ask::run(message).await?,
        Commands::Context {
            question,
            top_k,
            report,
        } => commands::context::run(&question, top_k, report).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
