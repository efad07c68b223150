use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_library::{api, byte_store::LocalByteStore, config::Config, storage::Database, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "media-library starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize database
    let db = Database::open(&config.node.data_dir)?;
    info!("Database opened at: {}", config.node.data_dir);

    // Initialize byte store
    let byte_store = LocalByteStore::new(&config.storage.media_dir, &config.storage.tmp_dir)?;
    info!(
        media_dir = %config.storage.media_dir,
        tmp_dir = %config.storage.tmp_dir,
        "Using local byte store"
    );

    // Create shared state
    let state = Arc::new(AppState::new(config.clone(), db, Arc::new(byte_store)));

    // Sweep stale upload sessions in the background
    let sweeper = config.uploads.session_ttl.map(|ttl| {
        let state = Arc::clone(&state);
        let every = config.uploads.sweep_interval;
        info!(?ttl, ?every, "Upload session sweeper enabled");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = state.uploads.prune_sessions(ttl).await {
                    tracing::error!(error = %e, "Upload session sweep failed");
                }
            }
        })
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!("Listening on: {}", config.node.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup: stop the sweeper, then release storage
    info!("Shutting down background tasks");
    if let Some(handle) = sweeper {
        handle.abort();
        let _ = handle.await;
    }

    match Arc::try_unwrap(state) {
        Ok(state) => {
            drop(state);
            info!("Database closed");
        }
        Err(_) => tracing::warn!("State still shared at shutdown, database closes on exit"),
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
