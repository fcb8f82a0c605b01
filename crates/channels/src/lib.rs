//! Chat channel implementations for DocBot.
//!
//! Each channel connects to a chat platform and relays questions to the
//! assistant and answers back.
//!
//! Available channels:
//! - **Telegram**: Bot API long polling
//! - **CLI**: Interactive terminal chat (stdin/stdout)

pub mod cli;
pub mod telegram;

pub use cli::CliChannel;
pub use telegram::{TelegramChannel, parse_command, split_message};
