// Translate Node
// Few-shot translation through the chat API

use async_trait::async_trait;

use crate::core::config::{ModelSettings, TranslatorConfig};
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ChainState;
use crate::llm::{ChatMessage, ChatRequest};

pub struct TranslateNode {
    input_key: &'static str,
    output_key: &'static str,
    source_lang: String,
    target_lang: String,
    examples: Vec<(String, String)>,
    settings: ModelSettings,
}

impl TranslateNode {
    pub fn new(input_key: &'static str, output_key: &'static str, config: &TranslatorConfig) -> Self {
        Self {
            input_key,
            output_key,
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            examples: example_pairs(config),
            settings: config.model.clone(),
        }
    }

    pub fn examples(&self) -> &[(String, String)] {
        &self.examples
    }

    fn messages(&self, text: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(format!(
            "You are a translator. Translate the user's {} text into {}. \
             Reply with the translation only.",
            self.source_lang, self.target_lang
        ))];
        for (source, target) in &self.examples {
            messages.push(ChatMessage::user(source.clone()));
            messages.push(ChatMessage::assistant(target.clone()));
        }
        messages.push(ChatMessage::user(text));
        messages
    }
}

/// Sentence pairs for the configured direction; languages missing from the
/// example table contribute none.
fn example_pairs(config: &TranslatorConfig) -> Vec<(String, String)> {
    match (
        config.parallel_examples.get(&config.source_lang),
        config.parallel_examples.get(&config.target_lang),
    ) {
        (Some(sources), Some(targets)) => sources
            .iter()
            .zip(targets)
            .map(|(s, t)| (s.clone(), t.clone()))
            .collect(),
        _ => {
            tracing::warn!(
                "No parallel examples for {} -> {}",
                config.source_lang,
                config.target_lang
            );
            Vec::new()
        }
    }
}

#[async_trait]
impl Node for TranslateNode {
    fn id(&self) -> &'static str {
        "translate"
    }

    fn name(&self) -> &'static str {
        "Translator"
    }

    async fn execute(
        &self,
        state: &mut ChainState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let text = state
            .get(self.input_key)
            .ok_or_else(|| GraphError::new(self.id(), format!("missing input: {}", self.input_key)))?;

        let request = ChatRequest::new(self.messages(text)).with_settings(&self.settings);
        let translation = ctx
            .llm
            .chat(request)
            .await
            .map_err(|e| GraphError::from_api(self.id(), e))?;

        state.set_output(self.output_key, translation.trim());
        Ok(NodeOutput::Final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn examples_follow_configured_direction() {
        let config = TranslatorConfig {
            source_lang: "English".to_string(),
            target_lang: "Japanese".to_string(),
            ..TranslatorConfig::default()
        };
        let node = TranslateNode::new("text", "translation", &config);

        assert_eq!(node.examples().len(), 2);
        assert_eq!(node.examples()[0].0, "How is the weather today");
        assert_eq!(node.examples()[0].1, "今日の天気はどうですか");

        let messages = node.messages("Good morning");
        assert_eq!(messages.len(), 1 + 2 * 2 + 1);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("into Japanese"));
        assert_eq!(messages.last(), Some(&ChatMessage::user("Good morning")));
    }

    #[test]
    fn unknown_language_has_no_examples() {
        let config = TranslatorConfig {
            target_lang: "Klingon".to_string(),
            ..TranslatorConfig::default()
        };
        let node = TranslateNode::new("text", "translation", &config);
        assert!(node.examples().is_empty());
        assert_eq!(node.messages("x").len(), 2);
    }
}
