//! Router fixture shared by the gateway integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tether_auth::JwtAuthenticator;
use tether_chats::{ChatService, Hub};
use tether_config::{AuthConfig, DatabaseConfig, HubConfig};
use tether_gateway::{create_router, GatewayState};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub chat: Arc<ChatService>,
    pub authenticator: JwtAuthenticator,
    _db_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub text: String,
    pub json: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = TempDir::new().expect("create temp dir");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_dir.path().join("gateway-test.db").display()),
            max_connections: 5,
        };
        let pool = tether_database::initialize_database(&config)
            .await
            .expect("initialise database");

        let chat = Arc::new(ChatService::with_store_notifications(pool));
        let hub_config = HubConfig {
            event_queue_capacity: 64,
            connection_buffer: 16,
        };
        let (hub, _broadcast) = Hub::start(chat.clone(), &hub_config);

        let authenticator = JwtAuthenticator::new(&AuthConfig {
            jwt_secret: "gateway-test-secret".to_string(),
            ..AuthConfig::default()
        });
        let state = GatewayState::new(
            hub,
            Arc::new(authenticator.clone()),
            hub_config.connection_buffer,
        );

        Self {
            router: create_router(state),
            chat,
            authenticator,
            _db_dir: db_dir,
        }
    }

    pub fn token_for(&self, user_id: i64) -> String {
        self.authenticator.issue(user_id).expect("issue token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let app = self.router.clone();
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = if let Some(json_body) = body {
            let bytes = serde_json::to_vec(&json_body).expect("serialize request body");
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(bytes)
        } else {
            Body::empty()
        };

        let response = app
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("dispatch request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect response body")
            .to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap_or_default();
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };

        TestResponse { status, text, json }
    }

    pub async fn as_user(&self, user_id: i64, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let token = self.token_for(user_id);
        self.request(method, uri, body, Some(&token)).await
    }

    /// Open (or fetch) the conversation between two users and return its id.
    pub async fn open_conversation(&self, caller: i64, other: i64) -> i64 {
        let response = self
            .as_user(caller, Method::POST, &format!("/api/conversations/{other}"), None)
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text);
        response.json["id"].as_i64().expect("conversation id")
    }
}
