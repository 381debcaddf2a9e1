use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tether_auth::IdentityProvider;
use tether_config::AppConfig;
use tether_runtime::BackendServices;
use tokio::time::timeout;

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

fn build_config(database_url: String, max_connections: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url;
    config.database.max_connections = max_connections;
    config.auth.jwt_secret = "runtime-test-secret".into();
    config
}

async fn initialise(config: &AppConfig) -> Result<BackendServices> {
    BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_runs_migrations_in_nested_directory() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/init.db");
    let config = build_config(sqlite_url(&db_path), 4);

    let services = initialise(&config).await?;
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' \
         AND name IN ('conversations', 'messages', 'notifications') ORDER BY name",
    )
    .fetch_all(&services.db_pool)
    .await?;

    assert_eq!(tables, vec!["conversations", "messages", "notifications"]);
    assert!(db_path.exists());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_wires_identity_and_chat_service() -> Result<()> {
    let config = build_config("sqlite://:memory:".into(), 1);
    let services = initialise(&config).await?;

    let token = services.authenticator.issue(7)?;
    let user = services.identity().authenticate(&token).await?;
    assert_eq!(user, 7);

    let conversation = services.chat_service.get_or_create_conversation(7, 8).await?;
    let message = services
        .hub
        .send_and_broadcast(conversation.id, 7, "booted")
        .await?;
    assert_eq!(message.content, "booted");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn broadcast_task_ends_once_the_hub_is_dropped() -> Result<()> {
    let config = build_config("sqlite://:memory:".into(), 1);
    let services = initialise(&config).await?;

    let BackendServices {
        hub,
        chat_service,
        broadcast_task,
        ..
    } = services;
    drop(hub);
    drop(chat_service);

    timeout(Duration::from_secs(2), broadcast_task)
        .await
        .context("broadcast loop kept running")??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_reports_unreachable_database() {
    let temp_dir = TempDir::new().expect("temp dir");
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").expect("write blocker");
    let config = build_config(sqlite_url(&blocker.join("nested/db.sqlite")), 1);

    let error = match BackendServices::initialise(&config).await {
        Ok(_) => panic!("expected initialisation to fail"),
        Err(error) => error,
    };
    assert!(format!("{error:#}").contains("failed to prepare database"));
}
