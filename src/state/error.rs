use thiserror::Error;

use crate::apps::AppKind;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize LLM service: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize knowledge base: {0}")]
    Knowledge(#[source] anyhow::Error),

    #[error("Failed to initialize chat history store: {0}")]
    History(#[source] anyhow::Error),

    #[error("Failed to build {app} app: {source}")]
    App {
        app: AppKind,
        #[source]
        source: anyhow::Error,
    },
}
