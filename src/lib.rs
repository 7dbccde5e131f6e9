pub mod commands;
pub mod config;
pub mod engine;
pub mod excel;
pub mod simulation;

use axum::routing::post;
use axum::Router;
use commands::AppState;
use config::Config;
use engine::EngineSlot;
use simulation::Simulator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// HTTP routes: `POST /simular`, JSON 404 for everything else
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/simular", post(commands::simular))
        .fallback(commands::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the service from `config` and serve until Ctrl-C
pub async fn run(config: Config) -> anyhow::Result<()> {
    let workbook_path = config.workbook_path()?;

    let engine = EngineSlot::resolve(&config.engine_config());
    if let EngineSlot::Unavailable(report) = &engine {
        tracing::warn!(
            ?report,
            "No formula engine available; simulations will fail until LibreOffice is installed"
        );
    }

    let simulator = Simulator::new(workbook_path, config.sheet.clone(), engine)
        .with_seed(config.seed)
        .with_persist(config.persist_options());

    if !simulator.workbook_path().exists() {
        tracing::warn!(
            path = %simulator.workbook_path().display(),
            "Workbook not found; simulations will fail until it exists"
        );
    }

    let state = Arc::new(AppState::new(simulator));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
