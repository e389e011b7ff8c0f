use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::DocumentRetriever;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {
    /// Directory to ingest; relative paths resolve against the project root.
    /// Must stay inside the project root, the data directory or the
    /// configured knowledge directory.
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub use_retriever: bool,
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<IngestRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let dir = request
        .dir
        .unwrap_or_else(|| state.settings.knowledge.data_dir.clone());
    let configured = state.paths.resolve(&state.settings.knowledge.data_dir);
    let target = state
        .paths
        .resolve_confined(&dir, &[configured])
        .map_err(|e| ApiError::BadRequest(format!("Cannot ingest {}: {}", dir, e)))?;
    let report = state.knowledge.ingest_dir(&target).await?;
    Ok(Json(report))
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state
        .knowledge
        .query(&payload.query, payload.use_retriever)
        .await?;
    Ok(Json(json!({ "documents": documents })))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let chunks = state.knowledge.count().await?;
    Ok(Json(json!({
        "collection": state.knowledge.collection(),
        "chunks": chunks,
    })))
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let removed = state.knowledge.reset().await?;
    Ok(Json(json!({ "removed": removed })))
}
