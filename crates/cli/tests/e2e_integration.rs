//! End-to-end integration tests for DocBot.
//!
//! These tests exercise the full pipeline from a chat message to the reply:
//! corpus on disk, lexical retrieval, prompt construction, completion, and
//! the history log.

use std::sync::{Arc, Mutex};

use docbot_agent::bot::{GREETING, THINKING};
use docbot_agent::{BotHandler, Outcome, RagAssistant};
use docbot_config::AppConfig;
use docbot_core::channel::{Channel, ChannelId, ChannelMessage};
use docbot_core::error::{ChannelError, ProviderError};
use docbot_core::history::HistoryStore;
use docbot_core::message::{Message, Role};
use docbot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use docbot_history::SqliteHistory;
use docbot_retrieval::{ContextAssembler, excerpt_header};
use tokio::sync::mpsc;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that answers with a fixed text and keeps every request.
struct ScriptedProvider {
    answer: String,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn text(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_system_prompt(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let request = requests.last().expect("provider was called");
        assert_eq!(request.messages[0].role, Role::System);
        request.messages[0].content.clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        Ok(ProviderResponse {
            message: Message::assistant(&self.answer),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
        })
    }
}

// ── Mock Channel ─────────────────────────────────────────────────────────

#[derive(Default)]
struct CapturingChannel {
    sent: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Channel for CapturingChannel {
    fn name(&self) -> &str {
        "capture"
    }

    fn id(&self) -> &ChannelId {
        static ID: std::sync::LazyLock<ChannelId> =
            std::sync::LazyLock::new(|| ChannelId("capture".into()));
        &ID
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(
        &self,
        _chat_id: &str,
        content: &str,
        _reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(content.to_string());
        Ok(())
    }

    fn is_allowed(&self, _sender_id: &str) -> bool {
        true
    }
}

fn telegram_message(sender: &str, text: &str) -> ChannelMessage {
    let mut metadata = serde_json::Map::new();
    if text == "/start" {
        metadata.insert("command".into(), "start".into());
    }
    ChannelMessage {
        channel_id: ChannelId("telegram".into()),
        sender_id: sender.into(),
        sender_name: Some(format!("user_{sender}")),
        content: text.into(),
        chat_id: sender.into(),
        message_id: Some("1".into()),
        metadata,
    }
}

/// A docs folder with three Bitrix24-style pages.
fn write_corpus(dir: &std::path::Path) {
    std::fs::write(
        dir.join("crm.deal.txt"),
        "crm.deal.add создает сделку. Чтобы создать сделку, передайте поля. \
         Сделку можно обновить методом crm.deal.update.",
    )
    .unwrap();
    std::fs::write(
        dir.join("crm.lead.txt"),
        "crm.lead.add добавляет лид в CRM.",
    )
    .unwrap();
    std::fs::write(
        dir.join("tasks.txt"),
        "tasks.task.add создает задачу.",
    )
    .unwrap();
    std::fs::write(dir.join("notes.md"), "сделку сделку сделку").unwrap();
}

fn config_for(docs: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    let docs = docs.to_string_lossy().into_owned();
    config.apply_env_overrides(|key| match key {
        "DOCBOT_DOCS_DIR" => Some(docs.clone()),
        _ => None,
    });
    config.validate().unwrap();
    config
}

// ── E2E: Retrieval over a real folder ────────────────────────────────────

#[tokio::test]
async fn e2e_context_from_directory() {
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());
    let config = config_for(docs.path());

    let retriever = ContextAssembler::from_config(&config.retrieval).unwrap();
    let retrieval = retriever.retrieve_default("Как создать сделку в Bitrix24?");

    assert!(!retrieval.fallback);
    assert_eq!(retrieval.corpus_size, 3, "notes.md is not in the allow-list");
    assert_eq!(retrieval.excerpts[0].name, "crm.deal.txt");
    assert!(retrieval.context.starts_with(&excerpt_header("crm.deal.txt")));
    assert!(retrieval.context.chars().count() <= config.retrieval.max_context_chars);
}

#[tokio::test]
async fn e2e_budget_drops_what_does_not_fit() {
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());
    let mut config = config_for(docs.path());
    config.retrieval.max_context_chars = excerpt_header("crm.deal.txt").chars().count() + 10;

    let retriever = ContextAssembler::from_config(&config.retrieval).unwrap();
    let retrieval = retriever.retrieve_default("crm.deal.add");

    assert!(retrieval.context.is_empty());
    assert_eq!(retrieval.dropped_for_budget(), retrieval.candidates);
}

// ── E2E: Full question pipeline ──────────────────────────────────────────

#[tokio::test]
async fn e2e_question_to_logged_answer() {
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());
    let data = tempfile::tempdir().unwrap();
    let db_path = data.path().join("history.sqlite");
    let config = config_for(docs.path());

    let provider = Arc::new(ScriptedProvider::text("Используйте метод crm.deal.add."));
    let retriever = Arc::new(ContextAssembler::from_config(&config.retrieval).unwrap());
    let assistant = Arc::new(RagAssistant::from_config(
        &config.assistant,
        provider.clone(),
        retriever,
    ));
    let history = Arc::new(SqliteHistory::new(db_path.to_str().unwrap()).await.unwrap());
    let bot = BotHandler::new(Some(assistant), history.clone());
    let channel = CapturingChannel::default();

    let greeted = bot
        .handle(&channel, &telegram_message("1001", "/start"))
        .await
        .unwrap();
    assert_eq!(greeted, Outcome::Greeted);
    assert_eq!(provider.calls(), 0);

    let outcome = bot
        .handle(&channel, &telegram_message("1001", "Как создать сделку?"))
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Answered { exchange: Some(_), .. }));

    // Prompt: instruction, blank line, then the best-matching document.
    let system = provider.last_system_prompt();
    assert!(system.starts_with(&config.assistant.system_prompt));
    assert!(system.contains("### Документ: crm.deal.txt"));

    let sent = channel.sent.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![
            GREETING.to_string(),
            THINKING.to_string(),
            "Используйте метод crm.deal.add.".to_string(),
        ]
    );

    let user = history.get_or_create_user("1001", None).await.unwrap();
    assert_eq!(user.username.as_deref(), Some("user_1001"));
    let logged = history.recent_exchanges(user.id, 5).await.unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].question, "Как создать сделку?");
    assert_eq!(logged[0].answer, "Используйте метод crm.deal.add.");
}

#[tokio::test]
async fn e2e_unmatched_question_uses_whole_corpus() {
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());
    let config = config_for(docs.path());

    let provider = Arc::new(ScriptedProvider::text("Не нашел в документации."));
    let retriever = Arc::new(ContextAssembler::from_config(&config.retrieval).unwrap());
    let assistant = RagAssistant::from_config(&config.assistant, provider.clone(), retriever);

    let answer = assistant.answer("weather forecast").await.unwrap();

    assert!(answer.retrieval.fallback);
    let names: Vec<_> = answer.retrieval.excerpts.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["crm.deal.txt", "crm.lead.txt", "tasks.txt"]);
    assert!(provider.last_system_prompt().contains("tasks.task.add"));
}

#[tokio::test]
async fn e2e_missing_docs_dir_still_answers() {
    let missing = tempfile::tempdir().unwrap().path().join("gone");
    let config = config_for(&missing);

    let provider = Arc::new(ScriptedProvider::text("Документация недоступна."));
    let retriever = Arc::new(ContextAssembler::from_config(&config.retrieval).unwrap());
    let assistant = RagAssistant::from_config(&config.assistant, provider.clone(), retriever);

    let answer = assistant.answer("Как создать сделку?").await.unwrap();

    assert_eq!(answer.retrieval.corpus_size, 0);
    assert!(answer.retrieval.context.is_empty());
    assert_eq!(
        provider.last_system_prompt(),
        format!("{}\n\n", config.assistant.system_prompt)
    );
}
