//! reco-server — composition root for the online serving core: loads
//! artifacts, connects to the context store, vector index, catalog,
//! and durable log, then serves recommendation and event endpoints.

mod rest;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use reco_artifact_loader::ArtifactLoader;
use reco_catalog_client::PostgresCatalog;
use reco_context_store::{ContextStore, ContextStoreClient};
use reco_core::config::AppConfig;
use reco_durable_log::DurableLog;
use reco_recommender::{EventFastPath, Orchestrator};
use reco_vector_index::QdrantVectorIndex;
use rest::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "reco-server")]
#[command(about = "Online serving core for the personalized product recommender")]
#[command(version)]
struct Cli {
    /// HTTP port (overrides config)
    #[arg(long, env = "RECO__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Directory holding the offline artifacts (overrides config)
    #[arg(long, env = "RECO__ARTIFACTS__DIR")]
    artifacts_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reco_server=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("reco-server starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(dir) = cli.artifacts_dir {
        config.artifacts.dir = dir;
    }

    info!(
        http_port = config.api.http_port,
        artifacts_dir = %config.artifacts.dir,
        "configuration loaded"
    );

    // Artifacts are loaded once at startup and shared read-only; a bad
    // artifact is fatal (see Exit conditions).
    let loader = Arc::new(ArtifactLoader::load(&config.artifacts)?);

    let vector_index = Arc::new(QdrantVectorIndex::new(&config.vector_index)?);

    let context_store: Arc<dyn ContextStore> = Arc::new(
        connect_with_retry("context store", || ContextStoreClient::new(&config.context_store)).await?,
    );

    let catalog = Arc::new(
        connect_with_retry("catalog", || PostgresCatalog::connect(&config.catalog)).await?,
    );

    let durable_log = Arc::new(
        connect_with_retry("durable log", || DurableLog::new(&config.catalog)).await?,
    );

    let orchestrator = Arc::new(Orchestrator::new(
        loader.clone(),
        vector_index.clone(),
        catalog.clone(),
        context_store.clone(),
        config.ranker.clone(),
    ));

    let event_fast_path = Arc::new(EventFastPath::new(
        context_store.clone(),
        catalog.clone(),
        durable_log,
    ));

    start_metrics_exporter(&config)?;

    let state = AppState {
        orchestrator,
        event_fast_path,
        start_time: Instant::now(),
    };

    let app_routes = Router::new()
        .route("/v1/recommend", post(rest::handle_recommend))
        .route("/v1/events", post(rest::handle_event))
        .with_state(state.clone());

    let ops_routes = Router::new()
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .with_state(state);

    let app = Router::new()
        .merge(app_routes)
        .merge(ops_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("reco-server is ready to serve traffic");

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("received SIGINT, shutting down");
        }
    };

    let addr = SocketAddr::new(config.api.host.parse()?, config.api.http_port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "starting HTTP server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("reco-server shut down cleanly");
    Ok(())
}

fn start_metrics_exporter(config: &AppConfig) -> anyhow::Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder
        .with_http_listener(SocketAddr::new(
            config.api.host.parse()?,
            config.metrics.port,
        ))
        .install_recorder()?;

    info!(port = config.metrics.port, "metrics exporter started");
    std::mem::forget(handle);
    Ok(())
}

/// Connect to an external dependency with exponential backoff (3 attempts).
async fn connect_with_retry<T, F, Fut>(service_name: &str, connect_fn: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let delays = [
        std::time::Duration::from_secs(0),
        std::time::Duration::from_secs(2),
        std::time::Duration::from_secs(4),
    ];
    let mut last_err = None;
    for (attempt, delay) in delays.iter().enumerate() {
        if attempt > 0 {
            warn!(service = service_name, attempt, "retrying connection after {}s", delay.as_secs());
            tokio::time::sleep(*delay).await;
        }
        match connect_fn().await {
            Ok(conn) => {
                info!(service = service_name, "connected successfully");
                return Ok(conn);
            }
            Err(e) => {
                error!(service = service_name, attempt, error = %e, "connection failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{service_name} connection failed")))
}
