use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.history.load(&conversation_id).await?;
    Ok(Json(json!({
        "conversation_id": conversation_id,
        "entries": entries,
    })))
}

pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.history.clear(&conversation_id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}
