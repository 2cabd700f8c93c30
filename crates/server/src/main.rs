mod bootstrap;
mod content;
mod health;
mod home;
mod routes;
mod scheduler;
mod service;
#[cfg(test)]
mod testing;

use std::time::Duration;

use anyhow::Result;
use simba_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use simba_core::config::LogFormat::*;

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let (shutdown_sender, shutdown_receiver) = watch::channel(false);

    let scheduler = if app.config.scheduler.enabled {
        Some(scheduler::spawn(
            app.schedule.clone(),
            app.timezone,
            app.service.clone(),
            shutdown_receiver,
        ))
    } else {
        tracing::info!(event_name = "scheduler.disabled", "daily prompt scheduler disabled");
        None
    };

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let state = routes::AppState::new(app.service.clone(), app.verifier.clone());

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "simba-server listening"
    );
    axum::serve(listener, routes::router(state, app.db_pool.clone()))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    let last_thread = app.register.get();
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        thread_id = last_thread.as_ref().map(|thread| thread.as_str()).unwrap_or("none"),
        "simba-server stopping"
    );
    let _ = shutdown_sender.send(true);
    if let Some(handle) = scheduler {
        let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!(
                event_name = "scheduler.shutdown_timeout",
                "scheduler did not stop in time"
            );
        }
    }
    app.thread_writer.abort();
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.signal.failed",
            error = %error,
            "could not listen for ctrl-c"
        );
    }
}
