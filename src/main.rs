use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use helperbot_backend::core::config::AppPaths;
use helperbot_backend::core::logging;
use helperbot_backend::server;
use helperbot_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize(paths).await?;

    if state.settings.knowledge.ingest_on_startup {
        let knowledge = state.knowledge.clone();
        let data_dir = state.paths.resolve(&state.settings.knowledge.data_dir);
        tokio::spawn(async move {
            match knowledge.ingest_dir(&data_dir).await {
                Ok(report) if !report.is_clean() => tracing::warn!(
                    "Startup ingestion finished with {} failed file(s)",
                    report.failed.len()
                ),
                Ok(_) => {}
                Err(err) => tracing::error!("Startup ingestion failed: {}", err),
            }
        });
    }

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(state.settings.server.port);
    let bind_addr = format!("{}:{}", state.settings.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("HELPERBOT_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
