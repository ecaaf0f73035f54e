use std::net::SocketAddr;
use std::sync::Arc;

use storyreel_api::config::ServerConfig;
use storyreel_api::router::build_app_router;
use storyreel_api::state::AppState;
use storyreel_client::api::EngineApi;
use storyreel_client::poller::JobPoller;
use storyreel_orchestrator::runner::EngineItemRunner;
use storyreel_orchestrator::service::BatchService;
use storyreel_orchestrator::store::BatchStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyreel_api=info,storyreel_orchestrator=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        engine_url = %config.client.engine_url,
        "Loaded server configuration",
    );

    // --- Execution engine ---
    let engine = Arc::new(
        EngineApi::new(&config.client.engine_url, config.client.request_timeout)
            .expect("Failed to build engine HTTP client"),
    );
    let poller = JobPoller::new(engine.clone(), config.client.retry_policy());
    let runner = Arc::new(EngineItemRunner::new(engine, poller));

    // --- Batch service ---
    let store = Arc::new(BatchStore::new(config.max_batches));
    let batches = Arc::new(BatchService::new(store, runner));
    tracing::info!(max_batches = config.max_batches, "Batch service started");

    let state = AppState {
        config: Arc::new(config.clone()),
        batches: Arc::clone(&batches),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server stopped accepting connections, cleaning up");
    batches.shutdown().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
