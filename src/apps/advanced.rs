//! History-aware helper bot that routes between a direct answer, a plain
//! conversation and knowledge-base retrieval.

use std::sync::Arc;

use async_trait::async_trait;

use super::{load_template, read_asset, AppKind, ChatApp};
use crate::core::config::{AdvancedHelperBotConfig, AppPaths};
use crate::core::errors::ApiError;
use crate::graph::builder::{AdvancedPrompts, AdvancedRouting};
use crate::graph::{build_advanced_graph, ChainState, GraphRuntime, NodeContext};
use crate::history::ChatHistoryStore;
use crate::llm::LlmService;
use crate::rag::DocumentRetriever;
use crate::session::Message;

pub struct AdvancedHelperBot {
    graph: GraphRuntime,
    llm: LlmService,
    retriever: Arc<dyn DocumentRetriever>,
    history: ChatHistoryStore,
    intent_list: String,
    default_conversation_id: String,
}

impl AdvancedHelperBot {
    pub fn new(
        llm: LlmService,
        retriever: Arc<dyn DocumentRetriever>,
        history: ChatHistoryStore,
        config: &AdvancedHelperBotConfig,
        paths: &AppPaths,
    ) -> anyhow::Result<Self> {
        let prompts = AdvancedPrompts {
            history_response: load_template(paths, &config.history_response_template)?,
            parse_intent: load_template(paths, &config.parse_intent_template)?,
            response: load_template(paths, &config.response_template)?,
        };
        let routing = AdvancedRouting {
            search_marker: config.search_marker.clone(),
            default_intent: config.default_intent.clone(),
        };
        let graph = build_advanced_graph(prompts, &config.model, routing)?;

        Ok(Self {
            graph,
            llm,
            retriever,
            history,
            intent_list: read_asset(paths, &config.intent_list_path)?,
            default_conversation_id: config.default_conversation_id.clone(),
        })
    }

    pub fn default_conversation_id(&self) -> &str {
        &self.default_conversation_id
    }

    /// Answers `user_message` in the context of the conversation's history
    /// file, then appends the exchange to it.
    pub async fn generate_answer(
        &self,
        user_message: &str,
        conversation_id: &str,
    ) -> Result<String, ApiError> {
        let chat_history = self.history.get_chat_history(conversation_id).await?;

        let mut state = ChainState::new()
            .with_var("user_message", user_message)
            .with_var("input", user_message)
            .with_var("intent_list", self.intent_list.as_str())
            .with_var("history", chat_history.as_str())
            .with_var("chat_history", chat_history);

        let ctx = NodeContext::new(&self.llm).with_retriever(self.retriever.as_ref());
        self.graph.run(&mut state, &ctx).await?;

        if let Some(intent) = state.get("intent") {
            tracing::info!("intent: {}", intent);
        }
        let answer = state
            .result()
            .map(str::to_string)
            .ok_or_else(|| ApiError::internal("advanced chain produced no answer"))?;

        self.history
            .log_turn(conversation_id, user_message, &answer)
            .await?;
        Ok(answer)
    }
}

#[async_trait]
impl ChatApp for AdvancedHelperBot {
    fn kind(&self) -> AppKind {
        AppKind::AdvancedHelperBot
    }

    async fn answer(&self, text: &str, _messages: &[Message]) -> Result<String, ApiError> {
        self.generate_answer(text, &self.default_conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Speaker;
    use crate::llm::testing::ScriptedProvider;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRetriever {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentRetriever for CountingRetriever {
        async fn query(&self, query: &str, _use_retriever: bool) -> Result<Vec<String>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![format!("doc about {}", query)])
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        bot: AdvancedHelperBot,
        provider: Arc<ScriptedProvider>,
        retriever: Arc<CountingRetriever>,
        history: ChatHistoryStore,
    }

    async fn fixture(replies: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let prompt_dir = dir.path().join("assets/prompt");
        fs::create_dir_all(&prompt_dir).unwrap();
        fs::write(prompt_dir.join("intent.txt"), "default\nkakao_sync").unwrap();
        fs::write(prompt_dir.join("parse_intent.txt"), "{intent_list}\n{user_message}").unwrap();
        fs::write(
            prompt_dir.join("response_template.txt"),
            "{related_documents}\n{user_message}",
        )
        .unwrap();
        fs::write(
            prompt_dir.join("history_response_template.txt"),
            "{chat_history}\n---\n{user_message}",
        )
        .unwrap();

        let paths = AppPaths::with_dirs(dir.path().to_path_buf(), dir.path().join("data"));
        let provider = Arc::new(ScriptedProvider::with_replies(replies.iter().copied()));
        let retriever = Arc::new(CountingRetriever::default());
        let history = ChatHistoryStore::new(dir.path().join("chat_histories"))
            .await
            .unwrap();
        let bot = AdvancedHelperBot::new(
            LlmService::new(provider.clone(), "chat", "embed"),
            retriever.clone(),
            history.clone(),
            &AdvancedHelperBotConfig::default(),
            &paths,
        )
        .unwrap();

        Fixture {
            _dir: dir,
            bot,
            provider,
            retriever,
            history,
        }
    }

    #[tokio::test]
    async fn each_turn_is_logged_and_fed_back() {
        let f = fixture(&["Hello there.", "Sync signs users up."]).await;

        assert_eq!(f.bot.answer("hi", &[]).await.unwrap(), "Hello there.");
        assert_eq!(
            f.bot.answer("what is sync?", &[]).await.unwrap(),
            "Sync signs users up."
        );

        let entries = f.history.load("fa1010").await.unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[2].speaker, Speaker::User);
        assert_eq!(entries[2].content, "what is sync?");

        let second_prompt = f.provider.chat_calls()[1].last_content().to_string();
        assert_eq!(second_prompt, "user: hi\nbot: Hello there.\n---\nwhat is sync?");
        assert_eq!(f.retriever.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_marker_with_specific_intent_uses_documents() {
        let f = fixture(&["Search", "kakao_sync", "From the docs."]).await;

        let answer = f.bot.generate_answer("sync setup", "conv-2").await.unwrap();

        assert_eq!(answer, "From the docs.");
        assert_eq!(f.retriever.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            f.provider.chat_calls()[2].last_content(),
            "doc about sync setup\nsync setup"
        );
        assert_eq!(f.history.load("conv-2").await.unwrap().len(), 2);
        assert!(f.history.load("fa1010").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_turn_is_not_logged() {
        let f = fixture(&[]).await;

        assert!(matches!(
            f.bot.answer("hi", &[]).await,
            Err(ApiError::Upstream(_))
        ));
        assert!(f.history.load("fa1010").await.unwrap().is_empty());
    }
}
