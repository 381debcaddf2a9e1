use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tether_auth::{IdentityProvider, JwtAuthenticator};
use tether_chats::{ChatService, Hub};
use tether_config::AppConfig;
use tether_database::initialize_database;
use tokio::task::JoinHandle;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the server wires together at startup.
///
/// Dropping every clone of `hub` closes the event queue, which lets `broadcast_task` finish.
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: JwtAuthenticator,
    pub chat_service: Arc<ChatService>,
    pub hub: Hub,
    pub broadcast_task: JoinHandle<()>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to prepare database")?;

        let authenticator = JwtAuthenticator::new(&config.auth);
        let chat_service = Arc::new(ChatService::with_store_notifications(db_pool.clone()));
        let (hub, broadcast_task) = Hub::start(Arc::clone(&chat_service), &config.hub);

        info!(
            database = %config.database.url,
            event_queue_capacity = config.hub.event_queue_capacity,
            connection_buffer = config.hub.connection_buffer,
            "backend services ready"
        );

        Ok(Self {
            db_pool,
            authenticator,
            chat_service,
            hub,
            broadcast_task,
        })
    }

    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        Arc::new(self.authenticator.clone())
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
