// Graph Builder
// Wires the prompt chains of each app into a petgraph runtime

use super::node::GraphError;
use super::nodes::{LlmChainNode, MarkerRouterNode, RetrievalNode, TranslateNode};
use super::runtime::{GraphBuilder, GraphRuntime};
use super::template::PromptTemplate;
use crate::core::config::{ModelSettings, TranslatorConfig};

/// Prompt used when the parsed intent is the default one. The chat history
/// fills `{history}`.
pub const CONVERSATION_TEMPLATE: &str = "The following is a friendly conversation between a human and an AI. \
The AI is talkative and provides lots of specific details from its context. \
If the AI does not know the answer to a question, it truthfully says it does not know.\n\n\
Current conversation:\n{history}\nHuman: {input}\nAI:";

pub struct HelperPrompts {
    pub question: PromptTemplate,
    pub trim: PromptTemplate,
    pub kind: PromptTemplate,
}

pub struct AdvancedPrompts {
    pub history_response: PromptTemplate,
    pub parse_intent: PromptTemplate,
    pub response: PromptTemplate,
}

pub struct AdvancedRouting {
    pub search_marker: String,
    pub default_intent: String,
}

/// answer -> trim_answer -> kind_answer
pub fn build_helper_graph(
    prompts: HelperPrompts,
    settings: &ModelSettings,
) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("answer")
        .node(Box::new(LlmChainNode::new(
            "answer",
            prompts.question,
            settings.clone(),
        )))
        .node(Box::new(LlmChainNode::new(
            "trim_answer",
            prompts.trim,
            settings.clone(),
        )))
        .node(Box::new(
            LlmChainNode::new("kind_answer", prompts.kind, settings.clone()).terminal(),
        ))
        .edge("answer", "trim_answer")
        .edge("trim_answer", "kind_answer")
        .build()
}

/// history_answer, then on the search marker: intent -> (conversation | retrieve -> answer)
pub fn build_advanced_graph(
    prompts: AdvancedPrompts,
    settings: &ModelSettings,
    routing: AdvancedRouting,
) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("history_answer")
        .node(Box::new(LlmChainNode::new(
            "history_answer",
            prompts.history_response,
            settings.clone(),
        )))
        .node(Box::new(MarkerRouterNode::new(
            "history_router",
            "history_answer",
            routing.search_marker,
            "search",
        )))
        .node(Box::new(LlmChainNode::new(
            "intent",
            prompts.parse_intent,
            settings.clone(),
        )))
        .node(Box::new(
            MarkerRouterNode::new("intent_router", "intent", routing.default_intent, "default")
                .otherwise("retrieve"),
        ))
        .node(Box::new(
            LlmChainNode::new(
                "conversation",
                PromptTemplate::parse(CONVERSATION_TEMPLATE),
                settings.clone(),
            )
            .output_key("output")
            .terminal(),
        ))
        .node(Box::new(RetrievalNode::new("user_message")))
        .node(Box::new(
            LlmChainNode::new("answer", prompts.response, settings.clone()).terminal(),
        ))
        .edge("history_answer", "history_router")
        .conditional_edge("history_router", "intent", "search")
        .edge("intent", "intent_router")
        .conditional_edge("intent_router", "conversation", "default")
        .conditional_edge("intent_router", "retrieve", "retrieve")
        .edge("retrieve", "answer")
        .build()
}

pub fn build_translator_graph(config: &TranslatorConfig) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("translate")
        .node(Box::new(TranslateNode::new("text", "translation", config)))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ApiError;
    use crate::graph::node::NodeContext;
    use crate::graph::state::ChainState;
    use crate::llm::testing::ScriptedProvider;
    use crate::llm::LlmService;
    use crate::rag::DocumentRetriever;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingRetriever {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentRetriever for CountingRetriever {
        async fn query(&self, _query: &str, _use_retriever: bool) -> Result<Vec<String>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["Kakao Sync doc".to_string(), "Channel doc".to_string()])
        }
    }

    fn advanced_graph() -> GraphRuntime {
        build_advanced_graph(
            AdvancedPrompts {
                history_response: PromptTemplate::parse("{chat_history}\n{user_message}"),
                parse_intent: PromptTemplate::parse("{intent_list}\n{user_message}"),
                response: PromptTemplate::parse("{related_documents}\nQ: {user_message}"),
            },
            &ModelSettings::new("gpt-3.5-turbo", 0.1, None),
            AdvancedRouting {
                search_marker: "Search".to_string(),
                default_intent: "default".to_string(),
            },
        )
        .unwrap()
    }

    fn advanced_state() -> ChainState {
        ChainState::new()
            .with_var("user_message", "How do I link a channel?")
            .with_var("input", "How do I link a channel?")
            .with_var("intent_list", "default, kakao_sync, kakao_channel")
            .with_var("chat_history", "user: hi\nbot: hello")
            .with_var("history", "user: hi\nbot: hello")
    }

    async fn run_advanced(replies: &[&str]) -> (ChainState, Arc<ScriptedProvider>, usize) {
        let provider = Arc::new(ScriptedProvider::with_replies(replies.iter().copied()));
        let llm = LlmService::new(provider.clone(), "chat", "embed");
        let retriever = CountingRetriever::default();
        let mut state = advanced_state();

        advanced_graph()
            .run(&mut state, &NodeContext::new(&llm).with_retriever(&retriever))
            .await
            .unwrap();
        (state, provider, retriever.calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn helper_chain_feeds_each_answer_forward() {
        let graph = build_helper_graph(
            HelperPrompts {
                question: PromptTemplate::parse("{info}|{history}|{question}"),
                trim: PromptTemplate::parse("trim: {answer}"),
                kind: PromptTemplate::parse("kind: {trim_answer}"),
            },
            &ModelSettings::new("gpt-3.5-turbo-16k", 0.1, Some(300)),
        )
        .unwrap();

        let provider = Arc::new(ScriptedProvider::with_replies([" raw ", "trimmed", "kind"]));
        let llm = LlmService::new(provider.clone(), "chat", "embed");
        let mut state = ChainState::new()
            .with_var("info", "INFO")
            .with_var("history", "")
            .with_var("question", "Q");

        graph.run(&mut state, &NodeContext::new(&llm)).await.unwrap();

        assert_eq!(state.result(), Some("kind"));
        assert_eq!(state.trace(), ["answer", "trim_answer", "kind_answer"]);
        let calls = provider.chat_calls();
        assert_eq!(calls[0].last_content(), "INFO||Q");
        assert_eq!(calls[1].last_content(), "trim: raw");
        assert_eq!(calls[2].last_content(), "kind: trimmed");
        assert_eq!(calls[0].model_id, "gpt-3.5-turbo-16k");
        assert_eq!(calls[0].request.max_tokens, Some(300));
    }

    #[tokio::test]
    async fn direct_answer_skips_retrieval() {
        let (state, provider, retrievals) =
            run_advanced(&["Link it from the channel admin page."]).await;

        assert_eq!(retrievals, 0);
        assert_eq!(provider.chat_call_count(), 1);
        assert_eq!(state.result(), Some("Link it from the channel admin page."));
    }

    #[tokio::test]
    async fn search_then_default_intent_uses_conversation_chain() {
        let (state, provider, retrievals) =
            run_advanced(&["Search", "default", "Happy to chat!"]).await;

        assert_eq!(retrievals, 0);
        assert_eq!(state.result_key(), Some("output"));
        assert_eq!(state.result(), Some("Happy to chat!"));
        let calls = provider.chat_calls();
        assert!(calls[2].last_content().contains("Current conversation:\nuser: hi\nbot: hello"));
        assert!(calls[2].last_content().ends_with("Human: How do I link a channel?\nAI:"));
    }

    #[tokio::test]
    async fn search_then_specific_intent_retrieves_once() {
        let (state, provider, retrievals) =
            run_advanced(&[" search. ", "kakao_channel", "Use the channel settings."]).await;

        assert_eq!(retrievals, 1);
        assert_eq!(state.get("intent"), Some("kakao_channel"));
        assert_eq!(state.result(), Some("Use the channel settings."));
        assert_eq!(
            provider.chat_calls()[2].last_content(),
            "Kakao Sync doc\n\nChannel doc\nQ: How do I link a channel?"
        );
        assert_eq!(
            state.trace(),
            ["history_answer", "history_router", "intent", "intent_router", "retrieve", "answer"]
        );
    }

    #[tokio::test]
    async fn upstream_failure_surfaces_with_node_id() {
        let provider = Arc::new(ScriptedProvider::default());
        provider.push_error("rate limited");
        let llm = LlmService::new(provider, "chat", "embed");

        let err = advanced_graph()
            .run(&mut advanced_state(), &NodeContext::new(&llm))
            .await
            .unwrap_err();
        assert_eq!(err.node_id, "history_answer");
        assert!(err.upstream);
    }

    #[test]
    fn graphs_are_acyclic() {
        assert!(!advanced_graph().has_cycle());
        let translator = build_translator_graph(&TranslatorConfig::default()).unwrap();
        assert_eq!(translator.node_ids(), vec!["translate"]);
    }
}
