// Graph Runtime - petgraph based
// Executes a prompt chain as a directed state graph

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::ChainState;

/// Edge condition for graph routing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Always follow this edge (default edge)
    Always,
    /// Follow this edge when the node returns this condition
    OnCondition(String),
}

impl EdgeCondition {
    pub fn on(condition: impl Into<String>) -> Self {
        Self::OnCondition(condition.into())
    }

    pub fn matches(&self, condition: Option<&str>) -> bool {
        match (self, condition) {
            (EdgeCondition::Always, None) => true,
            (EdgeCondition::OnCondition(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// petgraph-based StateGraph runtime
pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    /// Recursion limit
    max_steps: usize,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 16,
        }
    }

    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeIndex {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        index
    }

    pub fn add_conditional_edge(
        &mut self,
        from: &str,
        to: &str,
        condition: EdgeCondition,
    ) -> Result<(), GraphError> {
        let from_idx = self
            .node_indices
            .get(from)
            .ok_or_else(|| GraphError::new(from, format!("Source node not found: {}", from)))?;
        let to_idx = self
            .node_indices
            .get(to)
            .ok_or_else(|| GraphError::new(to, format!("Target node not found: {}", to)))?;

        self.graph.add_edge(*from_idx, *to_idx, condition);
        Ok(())
    }

    /// Node IDs, sorted
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.node_indices.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Execute the graph from the entry node until a node returns `Final`.
    pub async fn run(&self, state: &mut ChainState, ctx: &NodeContext<'_>) -> Result<(), GraphError> {
        if self.entry_node_id.is_empty() {
            return Err(GraphError::new("runtime", "No entry node set"));
        }

        let mut current_idx = *self.node_indices.get(&self.entry_node_id).ok_or_else(|| {
            GraphError::new(
                "runtime",
                format!("Entry node not found: {}", self.entry_node_id),
            )
        })?;

        let mut step = 0;

        loop {
            if step >= self.max_steps {
                return Err(GraphError::new(
                    "runtime",
                    format!("Maximum steps ({}) exceeded", self.max_steps),
                )
                .with_trace(state.trace()));
            }

            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| GraphError::new("runtime", "Node not found in graph"))?;

            let node_id = node.id();
            tracing::debug!("Executing node: {} (step {})", node_id, step);

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(err) => return Err(err.with_trace(state.trace())),
            };
            state.record_step(node_id);

            match output {
                NodeOutput::Final => {
                    tracing::debug!("Graph execution complete at node: {}", node_id);
                    return Ok(());
                }
                NodeOutput::Error(msg) => {
                    return Err(GraphError::new(node_id, msg).with_trace(state.trace()));
                }
                NodeOutput::Continue(explicit_next) => {
                    current_idx =
                        self.resolve_next_node(current_idx, None, explicit_next.as_deref())?;
                }
                NodeOutput::Branch(condition) => {
                    current_idx = self.resolve_next_node(current_idx, Some(&condition), None)?;
                }
            }

            step += 1;
        }
    }

    fn resolve_next_node(
        &self,
        current_idx: NodeIndex,
        condition: Option<&str>,
        explicit: Option<&str>,
    ) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        if let Some(next_id) = explicit {
            return self.node_indices.get(next_id).copied().ok_or_else(|| {
                GraphError::new(current_id, format!("Explicit target node not found: {}", next_id))
            });
        }

        let edges: Vec<(NodeIndex, &EdgeCondition)> = self
            .graph
            .edges_directed(current_idx, Direction::Outgoing)
            .map(|edge| (edge.target(), edge.weight()))
            .collect();

        if edges.is_empty() {
            return Err(GraphError::new(
                current_id,
                format!("No outgoing edges from node: {}", current_id),
            ));
        }

        if let Some((target, _)) = edges.iter().find(|(_, weight)| weight.matches(condition)) {
            return Ok(*target);
        }

        // Fall back to default (Always) edge
        if let Some((target, _)) = edges
            .iter()
            .find(|(_, weight)| **weight == EdgeCondition::Always)
        {
            tracing::warn!(
                "Condition '{}' not matched for node '{}', using default edge",
                condition.unwrap_or(""),
                current_id
            );
            return Ok(*target);
        }

        Err(GraphError::new(
            current_id,
            format!(
                "No matching edge for condition: {:?}",
                condition.unwrap_or("(none)")
            ),
        ))
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(condition)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        for (from, to, condition) in self.pending_edges {
            self.runtime.add_conditional_edge(&from, &to, condition)?;
        }
        if !self.runtime.node_indices.contains_key(&self.runtime.entry_node_id) {
            return Err(GraphError::new(
                "builder",
                format!("Entry node not found: {}", self.runtime.entry_node_id),
            ));
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;
    use crate::llm::LlmService;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Emit {
        id: &'static str,
        output: NodeOutput,
    }

    #[async_trait]
    impl Node for Emit {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn execute(
            &self,
            state: &mut ChainState,
            _ctx: &NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            state.set_output(self.id, self.id);
            Ok(self.output.clone())
        }
    }

    fn emit(id: &'static str, output: NodeOutput) -> Box<dyn Node> {
        Box::new(Emit { id, output })
    }

    fn llm() -> LlmService {
        LlmService::new(Arc::new(ScriptedProvider::default()), "chat", "embed")
    }

    #[test]
    fn test_edge_condition_matching() {
        assert!(EdgeCondition::Always.matches(None));
        assert!(!EdgeCondition::Always.matches(Some("chat")));

        assert!(EdgeCondition::on("chat").matches(Some("chat")));
        assert!(!EdgeCondition::on("chat").matches(Some("search")));
        assert!(!EdgeCondition::on("chat").matches(None));
    }

    #[tokio::test]
    async fn branch_follows_matching_edge_and_records_trace() {
        let graph = GraphBuilder::new()
            .entry("start")
            .node(emit("start", NodeOutput::Branch("right".to_string())))
            .node(emit("left", NodeOutput::Final))
            .node(emit("right", NodeOutput::Final))
            .conditional_edge("start", "left", "left")
            .conditional_edge("start", "right", "right")
            .build()
            .unwrap();

        let llm = llm();
        let mut state = ChainState::new();
        graph.run(&mut state, &NodeContext::new(&llm)).await.unwrap();

        assert_eq!(state.trace(), ["start", "right"]);
        assert_eq!(state.result(), Some("right"));
    }

    #[tokio::test]
    async fn unmatched_branch_uses_default_edge() {
        let graph = GraphBuilder::new()
            .entry("start")
            .node(emit("start", NodeOutput::Branch("unknown".to_string())))
            .node(emit("fallback", NodeOutput::Final))
            .edge("start", "fallback")
            .build()
            .unwrap();

        let llm = llm();
        let mut state = ChainState::new();
        graph.run(&mut state, &NodeContext::new(&llm)).await.unwrap();
        assert_eq!(state.trace(), ["start", "fallback"]);
    }

    #[tokio::test]
    async fn cycles_stop_at_max_steps() {
        let graph = GraphBuilder::new()
            .entry("a")
            .max_steps(5)
            .node(emit("a", NodeOutput::Continue(None)))
            .node(emit("b", NodeOutput::Continue(None)))
            .edge("a", "b")
            .edge("b", "a")
            .build()
            .unwrap();
        assert!(graph.has_cycle());

        let llm = llm();
        let err = graph
            .run(&mut ChainState::new(), &NodeContext::new(&llm))
            .await
            .unwrap_err();
        assert!(err.message.contains("Maximum steps"));
        assert_eq!(err.execution_trace.len(), 5);
    }

    #[test]
    fn build_rejects_unknown_nodes() {
        assert!(GraphBuilder::new()
            .entry("a")
            .node(emit("a", NodeOutput::Final))
            .edge("a", "missing")
            .build()
            .is_err());
        assert!(GraphBuilder::new()
            .entry("missing")
            .node(emit("a", NodeOutput::Final))
            .build()
            .is_err());
    }
}
