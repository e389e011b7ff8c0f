pub mod apps;
pub mod core;
pub mod graph;
pub mod history;
pub mod llm;
pub mod rag;
pub mod server;
pub mod session;
pub mod state;
pub mod vector_math;
