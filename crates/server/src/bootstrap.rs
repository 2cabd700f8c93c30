use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use cron::Schedule;
use secrecy::ExposeSecret;
use simba_core::config::{AppConfig, ConfigError, LoadOptions};
use simba_core::thread_slot::{spawn_writer, CurrentThread};
use simba_db::{
    connect_with_settings, migrations, DbPool, MoodLedger, SqlMoodRepository, SqlUserRepository,
};
use simba_slack::{HttpSlackClient, SignatureError, SignatureVerifier, SlackApi, SlackApiError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

use crate::content::HttpContentProvider;
use crate::home::HomeRenderer;
use crate::service::MoodService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: MoodService,
    pub register: CurrentThread,
    pub thread_writer: JoinHandle<()>,
    pub verifier: SignatureVerifier,
    pub schedule: Schedule,
    pub timezone: Tz,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("slack client setup failed: {0}")]
    Slack(#[from] SlackApiError),
    #[error("content client setup failed: {0}")]
    Content(#[source] reqwest::Error),
    #[error("signature verifier setup failed: {0}")]
    Signature(#[from] SignatureError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let schedule = config.scheduler.schedule()?;
    let timezone = config.scheduler.timezone()?;

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let ledger = MoodLedger::new(
        Arc::new(SqlUserRepository::new(db_pool.clone())),
        Arc::new(SqlMoodRepository::new(db_pool.clone())),
    );
    let slack: Arc<dyn SlackApi> = Arc::new(HttpSlackClient::new(
        config.slack.api_base_url.clone(),
        config.slack.bot_token.clone(),
        Duration::from_secs(config.slack.timeout_secs),
    )?);
    let content =
        Arc::new(HttpContentProvider::new(&config.content).map_err(BootstrapError::Content)?);
    let verifier = SignatureVerifier::new(config.slack.signing_secret.expose_secret())?;

    let register = CurrentThread::default();
    let (notifier, thread_writer) = spawn_writer(register.clone());
    let service = MoodService::new(
        ledger.clone(),
        slack.clone(),
        content,
        HomeRenderer::new(ledger, slack),
        register.clone(),
        notifier,
        config.slack.channel_id.clone(),
    );

    Ok(Application {
        config,
        db_pool,
        service,
        register,
        thread_writer,
        verifier,
        schedule,
        timezone,
    })
}
