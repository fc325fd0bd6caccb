//! Document Q&A Server Entry Point

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use docqa_config::{load_settings, Settings};
use docqa_server::{create_router, init_metrics, AppState};

const EXIT_OK: u8 = 0;
const EXIT_STARTUP_FAILURE: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let env = std::env::var("DOCQA_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("configuration error: {e}. Using defaults would skip validation, aborting.");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        },
    };

    init_tracing(&settings);
    tracing::info!("starting docqa-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(environment = ?settings.environment, env = env.as_deref().unwrap_or("default"), "configuration loaded");

    let metrics_handle = init_metrics();
    tracing::info!("initialized Prometheus metrics at /metrics");

    let runtime = match docqa_orchestrator::build_runtime(&settings).await {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to build pipeline runtime");
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        },
    };

    let state = AppState::new(settings.clone(), runtime, metrics_handle, env);
    let app = create_router(state);

    let addr: SocketAddr = match format!("{}:{}", settings.server.host, settings.server.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "invalid server bind address");
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        },
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, address = %addr, "failed to bind listener");
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        },
    };

    tracing::info!(address = %addr, "listening");

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!(error = %e, "server error");
        return ExitCode::from(EXIT_STARTUP_FAILURE);
    }

    tracing::info!("server shutdown complete");
    ExitCode::from(EXIT_OK)
}

/// Wait for Ctrl+C or SIGTERM (§5 cancellation is cooperative; shutdown is not).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("received SIGTERM, initiating graceful shutdown"),
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("docqa={},tower_http=debug", config.observability.log_level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
