//! CLI channel: questions from stdin, answers to stdout.
//!
//! Used by `docbot ask` when no question is passed on the command line.

use async_trait::async_trait;
use docbot_core::channel::{Channel, ChannelId, ChannelMessage};
use docbot_core::error::ChannelError;
use tokio::sync::mpsc;
use tokio::io::{self, AsyncBufReadExt, BufReader};

/// Interactive terminal channel.
pub struct CliChannel {
    id: ChannelId,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("cli".into()),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();

        tokio::spawn(async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(msg) = line_to_message(&channel_id, &line) else {
                            continue;
                        };
                        if is_exit(&msg.content) {
                            break;
                        }
                        if tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(
        &self,
        _chat_id: &str,
        content: &str,
        _reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        println!("{content}\n");
        Ok(())
    }

    fn is_allowed(&self, _sender_id: &str) -> bool {
        true // CLI is always allowed (local user)
    }
}

fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q")
}

/// A trimmed, non-empty input line as a message from the local user.
fn line_to_message(channel_id: &ChannelId, line: &str) -> Option<ChannelMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(ChannelMessage {
        channel_id: channel_id.clone(),
        sender_id: "local_user".into(),
        sender_name: std::env::var("USER").ok(),
        content: line.to_string(),
        chat_id: "cli_session".into(),
        message_id: None,
        metadata: serde_json::Map::new(),
    })
}
