pub mod openai;
pub mod provider;
pub mod service;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use provider::LlmProvider;
pub use service::LlmService;
pub use types::{ChatMessage, ChatRequest};
