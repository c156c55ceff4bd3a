use std::net::SocketAddr;

use backend::{
    build_router, database, load_config,
    workers::{rate_limit_sweep_worker, service_reminder_worker},
    AppState,
};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "nannyslm=info,backend=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Loads .env before the filter is read, so RUST_LOG can live there too
    let config = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Loaded configuration:\n{}", config);

    let pool = database::create_pool(&config.database)?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to run database migrations"))?;
    tracing::info!("Database migrations applied");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let reminders = config.reminders.clone();
    let state = AppState::new(pool.clone(), config)?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut workers = Vec::new();

    if state.config.rate_limit.enabled {
        workers.push(tokio::spawn(rate_limit_sweep_worker(
            state.rate_limiter.clone(),
            shutdown_tx.subscribe(),
        )));
    }
    if reminders.enabled {
        workers.push(tokio::spawn(service_reminder_worker(
            pool.clone(),
            state.mailer.clone(),
            reminders,
            shutdown_tx.subscribe(),
        )));
    } else {
        tracing::info!("Service reminders are disabled");
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "NannysLM API listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, waiting for workers");
    let _ = shutdown_tx.send(());
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "Worker task ended abnormally");
        }
    }

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
