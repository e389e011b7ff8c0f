// LLM Chain Node
// Fills a prompt template from the state and stores the completion

use async_trait::async_trait;

use crate::core::config::ModelSettings;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ChainState;
use crate::graph::template::PromptTemplate;

pub struct LlmChainNode {
    id: &'static str,
    template: PromptTemplate,
    output_key: &'static str,
    settings: ModelSettings,
    terminal: bool,
}

impl LlmChainNode {
    /// The node id doubles as the output key unless changed with [`Self::output_key`].
    pub fn new(id: &'static str, template: PromptTemplate, settings: ModelSettings) -> Self {
        Self {
            id,
            template,
            output_key: id,
            settings,
            terminal: false,
        }
    }

    pub fn output_key(mut self, key: &'static str) -> Self {
        self.output_key = key;
        self
    }

    /// Ends the run after this node instead of following its default edge.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }
}

#[async_trait]
impl Node for LlmChainNode {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        "LLM Chain"
    }

    async fn execute(
        &self,
        state: &mut ChainState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let prompt = self
            .template
            .render(state.variables())
            .map_err(|e| GraphError::new(self.id, e.to_string()))?;

        let completion = ctx
            .llm
            .complete(&prompt, &self.settings)
            .await
            .map_err(|e| GraphError::from_api(self.id, e))?;

        tracing::debug!("{} -> {} ({} chars)", self.id, self.output_key, completion.len());
        state.set_output(self.output_key, completion.trim());

        if self.terminal {
            Ok(NodeOutput::Final)
        } else {
            Ok(NodeOutput::Continue(None))
        }
    }
}
