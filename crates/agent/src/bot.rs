//! Chat bot front end: turns channel messages into answers.
//!
//! ```text
//! /start          → greeting
//! other commands  → ignored
//! any other text  → "Думаю над ответом..." → answer → history → reply
//! ```
//!
//! Each message is handled on its own task, so a slow completion never
//! holds up other chats. `serve` waits for those tasks before returning.

use std::sync::Arc;

use docbot_core::channel::{Channel, ChannelMessage};
use docbot_core::history::{Exchange, HistoryStore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::patterns::RagAssistant;

pub const GREETING: &str = "👋 Привет!\n\n\
    Я чат-бот для помощи разработчикам Bitrix24.\n\
    Задайте вопрос по API Bitrix24, и я отвечу, используя документацию Bitrix24.";

pub const THINKING: &str = "Думаю над ответом...";

pub const NOT_CONFIGURED: &str = "❌ Ассистент не настроен. Проверьте переменные окружения.";

/// What happened to one incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// `/start` was answered with the greeting.
    Greeted,
    /// A question was answered. `exchange` is `None` when logging failed.
    Answered {
        answer: String,
        exchange: Option<Exchange>,
    },
    /// The sender is not on the allowlist.
    Denied,
    /// Nothing to answer (blank text or a command other than `/start`).
    Ignored,
}

/// Routes channel messages to the assistant and logs every exchange.
pub struct BotHandler {
    /// `None` when completion credentials are missing.
    assistant: Option<Arc<RagAssistant>>,
    history: Arc<dyn HistoryStore>,
}

impl BotHandler {
    pub fn new(assistant: Option<Arc<RagAssistant>>, history: Arc<dyn HistoryStore>) -> Self {
        Self { assistant, history }
    }

    pub fn is_configured(&self) -> bool {
        self.assistant.is_some()
    }

    /// The text sent back for `question`: the answer, or a user-facing
    /// error message.
    pub async fn reply_text(&self, question: &str) -> String {
        let Some(assistant) = &self.assistant else {
            return NOT_CONFIGURED.to_string();
        };
        match assistant.answer(question).await {
            Ok(answer) => answer.answer,
            Err(e) => {
                error!(error = %e, "Assistant failed");
                format!("❌ Ошибка ассистента: {e}")
            }
        }
    }

    /// Handle one incoming message end to end.
    pub async fn handle(
        &self,
        channel: &dyn Channel,
        msg: &ChannelMessage,
    ) -> Result<Outcome, docbot_core::Error> {
        if !channel.is_allowed(&msg.sender_id) {
            warn!(channel = channel.name(), sender = %msg.sender_id, "Sender not allowed");
            return Ok(Outcome::Denied);
        }

        if msg.command() == Some("start") {
            channel.send(&msg.chat_id, GREETING, None).await?;
            return Ok(Outcome::Greeted);
        }
        if let Some(command) = msg.command() {
            debug!(command, "Ignoring unsupported command");
            return Ok(Outcome::Ignored);
        }

        let question = msg.content.trim();
        if question.is_empty() {
            return Ok(Outcome::Ignored);
        }

        info!(channel = channel.name(), sender = %msg.sender_id, "Question received");
        channel.send(&msg.chat_id, THINKING, None).await?;
        if let Err(e) = channel.send_typing(&msg.chat_id).await {
            debug!(error = %e, "Typing indicator failed");
        }

        let answer = self.reply_text(question).await;
        let exchange = match self.log_exchange(msg, question, &answer).await {
            Ok(exchange) => Some(exchange),
            Err(e) => {
                warn!(error = %e, "Failed to log exchange");
                None
            }
        };

        channel
            .send(&msg.chat_id, &answer, msg.message_id.as_deref())
            .await?;
        Ok(Outcome::Answered { answer, exchange })
    }

    async fn log_exchange(
        &self,
        msg: &ChannelMessage,
        question: &str,
        answer: &str,
    ) -> Result<Exchange, docbot_core::Error> {
        let user = self
            .history
            .get_or_create_user(&msg.sender_id, msg.sender_name.as_deref())
            .await?;
        Ok(self.history.save_exchange(&user, question, answer).await?)
    }

    /// Serve `channel` until its message stream ends, then wait for every
    /// in-flight handler to finish.
    ///
    /// Stopping the channel closes the stream, so `stop` followed by awaiting
    /// this future is a graceful shutdown.
    pub async fn serve(self: Arc<Self>, channel: Arc<dyn Channel>) -> Result<(), docbot_core::Error> {
        let mut rx = channel.start().await?;
        let mut handlers = JoinSet::new();
        info!(channel = channel.name(), "Bot is serving");

        loop {
            tokio::select! {
                incoming = rx.recv() => match incoming {
                    Some(Ok(msg)) => {
                        let handler = Arc::clone(&self);
                        let channel = Arc::clone(&channel);
                        handlers.spawn(async move {
                            if let Err(e) = handler.handle(channel.as_ref(), &msg).await {
                                error!(chat_id = %msg.chat_id, error = %e, "Failed to handle message");
                            }
                        });
                    }
                    Some(Err(e)) => warn!(channel = channel.name(), error = %e, "Channel error"),
                    None => break,
                },
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    Self::reap(joined);
                }
            }
        }

        if !handlers.is_empty() {
            info!(pending = handlers.len(), "Channel closed; waiting for in-flight messages");
        }
        while let Some(joined) = handlers.join_next().await {
            Self::reap(joined);
        }

        info!(channel = channel.name(), "Channel closed");
        Ok(())
    }

    fn reap(joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            error!(error = %e, "Message handler panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::RecordingProvider;
    use async_trait::async_trait;
    use docbot_core::channel::ChannelId;
    use docbot_core::error::{ChannelError, ProviderError};
    use docbot_history::InMemoryHistory;
    use docbot_retrieval::{ContextAssembler, InMemoryStore};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Records sent messages; optionally replays scripted incoming ones.
    struct RecordingChannel {
        id: ChannelId,
        allowed: bool,
        incoming: Mutex<Vec<ChannelMessage>>,
        sent: Mutex<Vec<(String, String, Option<String>)>>,
    }

    impl RecordingChannel {
        fn new(allowed: bool) -> Self {
            Self {
                id: ChannelId("test".into()),
                allowed,
                incoming: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, t, _)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "test"
        }

        fn id(&self) -> &ChannelId {
            &self.id
        }

        async fn start(
            &self,
        ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
            let (tx, rx) = mpsc::channel(8);
            for msg in self.incoming.lock().unwrap().drain(..) {
                tx.try_send(Ok(msg)).unwrap();
            }
            Ok(rx)
        }

        async fn send(
            &self,
            chat_id: &str,
            content: &str,
            reply_to: Option<&str>,
        ) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push((
                chat_id.to_string(),
                content.to_string(),
                reply_to.map(String::from),
            ));
            Ok(())
        }

        fn is_allowed(&self, _sender_id: &str) -> bool {
            self.allowed
        }
    }

    fn message(content: &str) -> ChannelMessage {
        let mut metadata = serde_json::Map::new();
        if let Some(command) = content.strip_prefix('/') {
            metadata.insert("command".into(), command.into());
        }
        ChannelMessage {
            channel_id: ChannelId("test".into()),
            sender_id: "42".into(),
            sender_name: Some("ivan".into()),
            content: content.into(),
            chat_id: "chat-42".into(),
            message_id: Some("7".into()),
            metadata,
        }
    }

    fn assistant(provider: RecordingProvider) -> Arc<RagAssistant> {
        let store = InMemoryStore::from_pairs([("deal.txt", "Метод crm.deal.add создает сделку.")]);
        let retriever = Arc::new(ContextAssembler::new(Arc::new(store)));
        Arc::new(RagAssistant::new(Arc::new(provider), retriever, "m"))
    }

    #[tokio::test]
    async fn start_command_greets() {
        let history = Arc::new(InMemoryHistory::new());
        let bot = BotHandler::new(None, history.clone());
        let channel = RecordingChannel::new(true);

        let outcome = bot.handle(&channel, &message("/start")).await.unwrap();

        assert_eq!(outcome, Outcome::Greeted);
        assert_eq!(channel.texts(), vec![GREETING.to_string()]);
        assert_eq!(history.count_exchanges().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn question_is_answered_and_logged() {
        let history = Arc::new(InMemoryHistory::new());
        let bot = BotHandler::new(
            Some(assistant(RecordingProvider::single_text("Вызовите crm.deal.add."))),
            history.clone(),
        );
        let channel = RecordingChannel::new(true);

        let outcome = bot.handle(&channel, &message("Как создать сделку?")).await.unwrap();

        let Outcome::Answered { answer, exchange } = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(answer, "Вызовите crm.deal.add.");
        let exchange = exchange.unwrap();
        assert_eq!(exchange.question, "Как создать сделку?");

        assert_eq!(channel.texts(), vec![THINKING.to_string(), answer.clone()]);
        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[1].0, "chat-42");
        assert_eq!(sent[1].2.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn unconfigured_assistant_replies_with_hint() {
        let history = Arc::new(InMemoryHistory::new());
        let bot = BotHandler::new(None, history.clone());
        let channel = RecordingChannel::new(true);

        bot.handle(&channel, &message("Как создать сделку?")).await.unwrap();

        assert_eq!(channel.texts().last().unwrap(), NOT_CONFIGURED);
        let user = history.get_or_create_user("42", None).await.unwrap();
        let logged = history.recent_exchanges(user.id, 1).await.unwrap();
        assert_eq!(logged[0].answer, NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn provider_failure_is_reported_to_user() {
        let bot = BotHandler::new(
            Some(assistant(RecordingProvider::failing(ProviderError::Timeout(
                "30s".into(),
            )))),
            Arc::new(InMemoryHistory::new()),
        );
        let channel = RecordingChannel::new(true);

        bot.handle(&channel, &message("Как создать сделку?")).await.unwrap();

        let last = channel.texts().last().unwrap().clone();
        assert!(last.starts_with("❌ Ошибка ассистента: "));
        assert!(last.contains("timed out"));
    }

    #[tokio::test]
    async fn denied_sender_gets_nothing() {
        let bot = BotHandler::new(None, Arc::new(InMemoryHistory::new()));
        let channel = RecordingChannel::new(false);

        let outcome = bot.handle(&channel, &message("hello")).await.unwrap();

        assert_eq!(outcome, Outcome::Denied);
        assert!(channel.texts().is_empty());
    }

    #[tokio::test]
    async fn blank_message_is_ignored() {
        let bot = BotHandler::new(None, Arc::new(InMemoryHistory::new()));
        let channel = RecordingChannel::new(true);

        let outcome = bot.handle(&channel, &message("   ")).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(channel.texts().is_empty());
    }

    #[tokio::test]
    async fn other_commands_are_ignored() {
        let provider = Arc::new(RecordingProvider::single_text("ok"));
        let store = InMemoryStore::from_pairs([("deal.txt", "crm.deal.add")]);
        let retriever = Arc::new(ContextAssembler::new(Arc::new(store)));
        let assistant = Arc::new(RagAssistant::new(provider.clone(), retriever, "m"));
        let history = Arc::new(InMemoryHistory::new());
        let bot = BotHandler::new(Some(assistant), history.clone());
        let channel = RecordingChannel::new(true);

        for text in ["/help", "/settings crm"] {
            let outcome = bot.handle(&channel, &message(text)).await.unwrap();
            assert_eq!(outcome, Outcome::Ignored);
        }

        assert_eq!(provider.call_count(), 0);
        assert!(channel.texts().is_empty());
        assert_eq!(history.count_exchanges().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn serve_waits_for_in_flight_answers() {
        let provider = RecordingProvider::single_text("ok").with_delay(Duration::from_millis(200));
        let history = Arc::new(InMemoryHistory::new());
        let bot = Arc::new(BotHandler::new(Some(assistant(provider)), history.clone()));
        let channel = Arc::new(RecordingChannel::new(true));
        {
            let mut incoming = channel.incoming.lock().unwrap();
            incoming.push(message("crm.deal.add"));
            incoming.push(message("Как создать сделку?"));
        }

        // The stream is already closed when `serve` starts reading it.
        bot.serve(channel.clone()).await.unwrap();

        let texts = channel.texts();
        assert_eq!(texts.len(), 4);
        assert_eq!(texts.iter().filter(|t| *t == THINKING).count(), 2);
        assert_eq!(texts.iter().filter(|t| *t == "ok").count(), 2);
        assert_eq!(history.count_exchanges().await.unwrap(), 2);
    }
}
