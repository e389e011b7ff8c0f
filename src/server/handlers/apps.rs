use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::apps::AppKind;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetTextRequest {
    pub text: String,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Path(app): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: AppKind = app.parse()?;
    state.apps.get(kind)?;
    let session = state.sessions.create(kind).await;
    Ok((StatusCode::CREATED, Json(json!({ "session": session }))))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path((app, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.get(app.parse()?, &session_id).await?;
    state.sessions.remove(&session_id).await;
    tracing::debug!("Removed {} session {}", app, session_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_text(
    State(state): State<Arc<AppState>>,
    Path((app, session_id)): Path<(String, String)>,
    Json(payload): Json<SetTextRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.get(app.parse()?, &session_id).await?;
    let mut session = session.lock().await;
    session.set_text(payload.text);
    Ok(Json(json!({
        "session_id": session.id,
        "text": session.text,
        "version": session.version,
    })))
}

pub async fn get_output(
    State(state): State<Arc<AppState>>,
    Path((app, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: AppKind = app.parse()?;
    let chat_app = state.apps.get(kind)?;
    let session = state.sessions.get(kind, &session_id).await?;
    let mut session = session.lock().await;

    let output = session.output(chat_app.as_ref()).await?;
    Ok(Json(json!({
        "output": output,
        "version": session.version,
    })))
}

pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path((app, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: AppKind = app.parse()?;
    let chat_app = state.apps.get(kind)?;
    let session = state.sessions.get(kind, &session_id).await?;
    let mut session = session.lock().await;

    let message = session.post(chat_app.as_ref()).await?.clone();
    tracing::info!("{} session {} posted message #{}", kind, session.id, session.messages.len());
    Ok(Json(json!({
        "message": message,
        "messages": session.messages,
        "version": session.version,
    })))
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path((app, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.get(app.parse()?, &session_id).await?;
    let session = session.lock().await;
    Ok(Json(json!({
        "messages": session.messages,
        "version": session.version,
    })))
}

pub async fn clear_messages(
    State(state): State<Arc<AppState>>,
    Path((app, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.get(app.parse()?, &session_id).await?;
    let mut session = session.lock().await;
    session.clear();
    Ok(Json(json!({
        "status": "cleared",
        "version": session.version,
    })))
}
