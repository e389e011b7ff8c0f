//! Few-shot translator between two configured languages.

use async_trait::async_trait;

use super::{AppKind, ChatApp};
use crate::core::config::TranslatorConfig;
use crate::core::errors::ApiError;
use crate::graph::{build_translator_graph, ChainState, GraphRuntime, NodeContext};
use crate::llm::LlmService;
use crate::session::Message;

pub struct Translator {
    graph: GraphRuntime,
    llm: LlmService,
    target_lang: String,
}

impl Translator {
    pub fn new(llm: LlmService, config: &TranslatorConfig) -> anyhow::Result<Self> {
        Ok(Self {
            graph: build_translator_graph(config)?,
            llm,
            target_lang: config.target_lang.clone(),
        })
    }
}

#[async_trait]
impl ChatApp for Translator {
    fn kind(&self) -> AppKind {
        AppKind::Translator
    }

    fn target_lang(&self) -> Option<&str> {
        Some(&self.target_lang)
    }

    async fn answer(&self, text: &str, _messages: &[Message]) -> Result<String, ApiError> {
        let mut state = ChainState::new().with_var("text", text);
        self.graph.run(&mut state, &NodeContext::new(&self.llm)).await?;
        state
            .result()
            .map(str::to_string)
            .ok_or_else(|| ApiError::internal("translator produced no output"))
    }
}
