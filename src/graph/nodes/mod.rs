// Graph Nodes

pub mod llm_chain;
pub mod retrieval;
pub mod router;
pub mod translate;

pub use llm_chain::LlmChainNode;
pub use retrieval::{RetrievalNode, RELATED_DOCUMENTS};
pub use router::{marker_matches, MarkerRouterNode};
pub use translate::TranslateNode;
