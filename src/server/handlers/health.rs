use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use crate::apps::AppKind;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let apps: Vec<&str> = state.apps.kinds().iter().map(AppKind::slug).collect();
    Json(json!({
        "status": "ok",
        "provider": state.llm.provider_name(),
        "apps": apps,
    }))
}
