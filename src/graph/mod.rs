// Prompt Graph Module
// LangGraph-style StateGraph for chaining LLM calls

pub mod builder;
pub mod node;
pub mod nodes;
pub mod runtime;
pub mod state;
pub mod template;

pub use builder::{build_advanced_graph, build_helper_graph, build_translator_graph};
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::GraphRuntime;
pub use state::ChainState;
pub use template::{PromptTemplate, TemplateError};
