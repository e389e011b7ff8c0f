//! One-shot ingestion: `helperbot-ingest [DIR]`.
//!
//! Embeds every allowed file below DIR (default: the configured data
//! directory) into the knowledge collection and prints the report as JSON.
//! Exits with status 1 when any file failed.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use helperbot_backend::core::config::{AppPaths, ConfigService};
use helperbot_backend::core::logging;
use helperbot_backend::llm::LlmService;
use helperbot_backend::rag::{KnowledgeBase, SqliteVectorStore};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let paths = Arc::new(AppPaths::new());
    logging::init_with_file(&paths, "ingest.log");

    let config = ConfigService::new(paths.clone());
    let settings = config.load_settings().context("Failed to load configuration")?;
    let llm = LlmService::from_config(&settings.llm, config.resolve_api_key(&settings))?;

    let persist_dir = paths.resolve(&settings.knowledge.persist_dir);
    let store = SqliteVectorStore::open(&persist_dir)
        .await
        .with_context(|| format!("Failed to open vector store in {}", persist_dir.display()))?;
    let knowledge = KnowledgeBase::new(Arc::new(store), llm, &settings.knowledge);

    let dir = env::args()
        .nth(1)
        .unwrap_or_else(|| settings.knowledge.data_dir.clone());
    let report = knowledge.ingest_dir(&paths.resolve(&dir)).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
