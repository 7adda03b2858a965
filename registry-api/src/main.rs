use std::sync::Arc;

use axum::Router;
use envconfig::Envconfig;
use eyre::{Result, WrapErr};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::AdminCredentials;
use config::Config;
use registry_common::metrics::{setup_metrics_recorder, setup_metrics_routes};
use registry_common::store::PgPersonStore;

mod auth;
mod config;
mod error;
mod handlers;
mod render;

async fn listen(app: Router, bind: String) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .wrap_err_with(|| format!("failed to bind {bind}"))?;
    info!("listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
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

    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::init_from_env().wrap_err("failed to load configuration from env")?;

    let store = PgPersonStore::new(&config.database_url, config.max_pg_connections)
        .await
        .wrap_err("failed to connect to the database")?;
    store
        .migrate()
        .await
        .wrap_err("failed to create the people table")?;
    info!("database schema is up to date");

    let credentials = AdminCredentials::new(&config.admin_user, &config.admin_pass);

    let app = handlers::add_routes(
        Router::new(),
        Arc::new(store),
        credentials,
        config.max_body_size,
        config.concurrency_limit,
    );

    let recorder_handle = if config.export_prometheus {
        Some(setup_metrics_recorder().wrap_err("failed to install metrics recorder")?)
    } else {
        None
    };
    let app = setup_metrics_routes(app, recorder_handle);

    listen(app, config.bind()).await
}
