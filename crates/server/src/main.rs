mod api;
mod config;
mod state;
mod utils;

use std::sync::Arc;

use api::api_router;
use axum::Router;
use config::{config_path_from_env, load_or_create_config, resolve_dir, ServerConfig};
use library::{BatchOptions, BatchScheduler, LogSink};
use parking_lot::RwLock;
use state::AppState;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let scheduler = BatchScheduler::new(Arc::new(LogSink))
        .with_default_gap(config.default_gap)
        .with_shutdown_grace(config.shutdown_grace());
    let state = AppState {
        scheduler: scheduler.clone(),
        config_path,
        config: Arc::new(RwLock::new(config.clone())),
    };

    if config.autostart {
        autostart(&state, &config);
    }

    let app = Router::new()
        .nest("/api/v1", api_router(state.clone()))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let wait = config.shutdown_wait;
    let stopped = tokio::task::spawn_blocking(move || scheduler.shutdown(wait)).await?;
    if !stopped {
        warn!("Exiting with an album still in progress");
    }
    Ok(())
}

/// Loads and starts a batch from the configured roots; failures are logged
/// and leave the server idle.
fn autostart(state: &AppState, config: &ServerConfig) {
    let input_root = resolve_dir(&state.config_path, &config.input_root);
    let output_root = resolve_dir(&state.config_path, &config.output_root);
    let (Some(input_root), Some(output_root)) = (input_root, output_root) else {
        warn!("autostart needs both input_root and output_root; skipping");
        return;
    };

    if let Err(err) = state.scheduler.load_albums(&input_root) {
        warn!("autostart: failed to load {}: {}", input_root.display(), err);
        return;
    }
    let options = BatchOptions {
        output_root,
        bitrate: config.bitrate,
        naming: config.naming_mode,
    };
    if let Err(err) = state.scheduler.start(options) {
        warn!("autostart: failed to start batch: {}", err);
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received.");
}
