//! Product Q&A over a static background document.

use async_trait::async_trait;

use super::{load_template, read_asset, AppKind, ChatApp};
use crate::core::config::{AppPaths, HelperBotConfig};
use crate::core::errors::ApiError;
use crate::graph::builder::HelperPrompts;
use crate::graph::{build_helper_graph, ChainState, GraphRuntime, NodeContext};
use crate::llm::LlmService;
use crate::session::Message;

pub struct HelperBot {
    graph: GraphRuntime,
    llm: LlmService,
    info: String,
}

impl HelperBot {
    pub fn new(llm: LlmService, config: &HelperBotConfig, paths: &AppPaths) -> anyhow::Result<Self> {
        let prompts = HelperPrompts {
            question: load_template(paths, &config.question_template)?,
            trim: load_template(paths, &config.trim_template)?,
            kind: load_template(paths, &config.kind_template)?,
        };
        let info = read_asset(paths, &config.info_path)?;
        let graph = build_helper_graph(prompts, &config.model)?;
        Ok(Self { graph, llm, info })
    }
}

/// Earlier exchanges, oldest first, as plain question/answer lines.
pub fn format_history(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .map(|m| format!("Q: {}\nA: {}", m.question_text, m.answer_text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ChatApp for HelperBot {
    fn kind(&self) -> AppKind {
        AppKind::HelperBot
    }

    async fn answer(&self, text: &str, messages: &[Message]) -> Result<String, ApiError> {
        let mut state = ChainState::new()
            .with_var("info", self.info.as_str())
            .with_var("question", text)
            .with_var("history", format_history(messages));

        self.graph.run(&mut state, &NodeContext::new(&self.llm)).await?;

        state
            .result()
            .map(str::to_string)
            .ok_or_else(|| ApiError::internal("helper chain produced no answer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;
    use std::fs;
    use std::sync::Arc;

    fn write_assets(root: &std::path::Path) {
        let assets = root.join("assets");
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("kakao_sync.txt"), "Kakao Sync is a sign-up service.").unwrap();
        fs::write(
            assets.join("question_template.txt"),
            "<info>{info}</info>\n<history>{history}</history>\n{question}",
        )
        .unwrap();
        fs::write(assets.join("trim_template.txt"), "Trim: {answer}").unwrap();
        fs::write(assets.join("kind_template.txt"), "Kindly: {trim_answer}").unwrap();
    }

    #[tokio::test]
    async fn answers_through_three_calls_with_history() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path());
        let paths = AppPaths::with_dirs(dir.path().to_path_buf(), dir.path().join("data"));

        let provider = Arc::new(ScriptedProvider::with_replies(["long", "short", "friendly"]));
        let llm = LlmService::new(provider.clone(), "chat", "embed");
        let bot = HelperBot::new(llm, &HelperBotConfig::default(), &paths).unwrap();

        let history = vec![
            Message::new("second?", "two", None),
            Message::new("first?", "one", None),
        ];
        let answer = bot.answer("What is it?", &history).await.unwrap();

        assert_eq!(answer, "friendly");
        let calls = provider.chat_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0].last_content(),
            "<info>Kakao Sync is a sign-up service.</info>\n\
             <history>Q: first?\nA: one\nQ: second?\nA: two</history>\nWhat is it?"
        );
        assert_eq!(calls[0].model_id, "gpt-3.5-turbo-16k");
        assert_eq!(calls[0].request.temperature, Some(0.1));
    }

    #[test]
    fn missing_template_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_dirs(dir.path().to_path_buf(), dir.path().join("data"));
        let llm = LlmService::new(Arc::new(ScriptedProvider::default()), "chat", "embed");

        assert!(HelperBot::new(llm, &HelperBotConfig::default(), &paths).is_err());
    }
}
