// Node trait and types
// Base abstraction for prompt-chain nodes

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::LlmService;
use crate::rag::DocumentRetriever;

use super::state::ChainState;

/// Services available to nodes during one run
pub struct NodeContext<'a> {
    /// Chat-completion access
    pub llm: &'a LlmService,
    /// Knowledge-base lookup; graphs without a retrieval step run without one
    pub retriever: Option<&'a dyn DocumentRetriever>,
}

impl<'a> NodeContext<'a> {
    pub fn new(llm: &'a LlmService) -> Self {
        Self {
            llm,
            retriever: None,
        }
    }

    pub fn with_retriever(mut self, retriever: &'a dyn DocumentRetriever) -> Self {
        self.retriever = Some(retriever);
        self
    }
}

/// Output from a node execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutput {
    /// Continue to the specified next node (None = use default edge)
    Continue(Option<String>),
    /// Branch to one of the specified nodes based on condition
    Branch(String),
    /// Graph execution complete
    Final,
    /// Error occurred
    Error(String),
}

/// Graph execution error
///
/// `execution_trace` records the node IDs visited before the failure.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    /// Ordered list of node IDs executed before this error, most-recent last.
    pub execution_trace: Vec<String>,
    /// The failure came from the chat or embeddings API.
    pub upstream: bool,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
            upstream: false,
        }
    }

    /// Wraps a service error, keeping upstream failures distinguishable.
    pub fn from_api(node_id: impl Into<String>, err: ApiError) -> Self {
        let upstream = matches!(err, ApiError::Upstream(_));
        let message = match err {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Upstream(msg)
            | ApiError::Internal(msg) => msg,
        };
        Self {
            upstream,
            ..Self::new(node_id, message)
        }
    }

    pub fn with_trace(mut self, trace: &[String]) -> Self {
        self.execution_trace = trace.to_vec();
        self
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        if err.upstream {
            ApiError::Upstream(err.message)
        } else {
            ApiError::internal(err)
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the node logic
    async fn execute(
        &self,
        state: &mut ChainState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
