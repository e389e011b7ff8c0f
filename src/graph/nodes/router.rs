// Marker Router Node
// Branches on whether a model output equals a marker word

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::ChainState;

pub struct MarkerRouterNode {
    id: &'static str,
    input_key: &'static str,
    marker: String,
    on_match: &'static str,
    /// `None` ends the run, leaving the input as the answer.
    otherwise: Option<&'static str>,
}

impl MarkerRouterNode {
    pub fn new(
        id: &'static str,
        input_key: &'static str,
        marker: impl Into<String>,
        on_match: &'static str,
    ) -> Self {
        Self {
            id,
            input_key,
            marker: marker.into(),
            on_match,
            otherwise: None,
        }
    }

    pub fn otherwise(mut self, route: &'static str) -> Self {
        self.otherwise = Some(route);
        self
    }
}

#[async_trait]
impl Node for MarkerRouterNode {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        "Marker Router"
    }

    async fn execute(
        &self,
        state: &mut ChainState,
        _ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let value = state.get(self.input_key).ok_or_else(|| {
            GraphError::new(self.id, format!("missing router input: {}", self.input_key))
        })?;

        let matched = marker_matches(value, &self.marker);
        let route = if matched { Some(self.on_match) } else { self.otherwise };

        tracing::info!(
            "{}: {}={:?}, marker={:?}, routing to {}",
            self.id,
            self.input_key,
            value,
            self.marker,
            route.unwrap_or("end")
        );

        Ok(match route {
            Some(route) => NodeOutput::Branch(route.to_string()),
            None => NodeOutput::Final,
        })
    }
}

/// Compares a model reply with a marker, ignoring case, surrounding
/// whitespace, quotes and trailing punctuation.
pub fn marker_matches(value: &str, marker: &str) -> bool {
    normalize(value).eq_ignore_ascii_case(normalize(marker))
}

fn normalize(text: &str) -> &str {
    let mut current = text.trim();
    loop {
        let next = current
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`'))
            .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ':' | ';' | ','))
            .trim();
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}
