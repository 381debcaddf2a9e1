//! Shared fixtures for the chats integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tether_chats::{ChatService, NewNotification, NotificationSink};
use tether_config::DatabaseConfig;
use tokio::sync::mpsc;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub struct TestContext {
    pub pool: SqlitePool,
    _temp_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("chats.sqlite").display()),
            max_connections: 5,
        };
        let pool = tether_database::initialize_database(&config).await?;

        Ok(Self {
            pool,
            _temp_dir: temp_dir,
        })
    }

    pub fn store_service(&self) -> Arc<ChatService> {
        Arc::new(ChatService::with_store_notifications(self.pool.clone()))
    }

    pub fn service_with(&self, sink: Arc<dyn NotificationSink>) -> Arc<ChatService> {
        Arc::new(ChatService::new(self.pool.clone(), sink))
    }
}

/// Sink that remembers every notification it was handed.
#[derive(Default)]
pub struct RecordingSink {
    pub seen: Mutex<Vec<NewNotification>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: NewNotification) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Sink that always fails.
pub struct BrokenSink;

#[async_trait]
impl NotificationSink for BrokenSink {
    async fn notify(&self, _notification: NewNotification) -> anyhow::Result<()> {
        anyhow::bail!("notification store unavailable")
    }
}

/// Next frame on a connection's buffer as JSON, failing the test after one second.
pub async fn next_frame(rx: &mut mpsc::Receiver<String>) -> serde_json::Value {
    let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection buffer closed");
    serde_json::from_str(&frame).expect("frame is not JSON")
}

/// Assert nothing arrives on the buffer for a short while.
pub async fn assert_quiet(rx: &mut mpsc::Receiver<String>) {
    let outcome = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(outcome.is_err(), "unexpected frame: {outcome:?}");
}
