use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{apps, config, health, history, knowledge};
use crate::server::page;
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware
/// - Health check and app pages
/// - Session API per app (text, output, post, messages)
/// - Knowledge base, chat history and config endpoints
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_allowed_origins);
    Router::new()
        .route("/health", get(health::health))
        .route("/", get(page::index))
        .route("/apps/:app", get(page::app_page))
        .route("/api/apps/:app/sessions", post(apps::create_session))
        .route(
            "/api/apps/:app/sessions/:session_id",
            axum::routing::delete(apps::delete_session),
        )
        .route("/api/apps/:app/sessions/:session_id/text", put(apps::set_text))
        .route(
            "/api/apps/:app/sessions/:session_id/output",
            get(apps::get_output),
        )
        .route(
            "/api/apps/:app/sessions/:session_id/post",
            post(apps::post_message),
        )
        .route(
            "/api/apps/:app/sessions/:session_id/messages",
            get(apps::get_messages).delete(apps::clear_messages),
        )
        .route("/api/knowledge", axum::routing::delete(knowledge::reset))
        .route("/api/knowledge/ingest", post(knowledge::ingest))
        .route("/api/knowledge/query", post(knowledge::query))
        .route("/api/knowledge/stats", get(knowledge::stats))
        .route(
            "/api/history/:conversation_id",
            get(history::get_history).delete(history::delete_history),
        )
        .route("/api/config", get(config::get_config))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let origins = resolve_allowed_origins(configured)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins: Vec<String> = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        return default_local_origins();
    }
    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:8000".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}
