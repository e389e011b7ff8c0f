// Retrieval Node
// Looks up related documents in the knowledge base

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ChainState;

pub const RELATED_DOCUMENTS: &str = "related_documents";

pub struct RetrievalNode {
    query_key: &'static str,
    use_retriever: bool,
}

impl RetrievalNode {
    pub fn new(query_key: &'static str) -> Self {
        Self {
            query_key,
            use_retriever: false,
        }
    }

    /// Apply the knowledge base's score threshold and duplicate filtering.
    pub fn use_retriever(mut self, enabled: bool) -> Self {
        self.use_retriever = enabled;
        self
    }
}

#[async_trait]
impl Node for RetrievalNode {
    fn id(&self) -> &'static str {
        "retrieve"
    }

    fn name(&self) -> &'static str {
        "Knowledge Retrieval"
    }

    async fn execute(
        &self,
        state: &mut ChainState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let retriever = ctx
            .retriever
            .ok_or_else(|| GraphError::new(self.id(), "no knowledge base available"))?;
        let query = state
            .get(self.query_key)
            .ok_or_else(|| GraphError::new(self.id(), format!("missing query: {}", self.query_key)))?
            .to_string();

        let documents = retriever
            .query(&query, self.use_retriever)
            .await
            .map_err(|e| GraphError::from_api(self.id(), e))?;

        tracing::info!("Retrieved {} document(s) for query", documents.len());
        state.set(RELATED_DOCUMENTS, documents.join("\n\n"));
        Ok(NodeOutput::Continue(None))
    }
}
