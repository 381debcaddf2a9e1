//! # Tether Gateway Crate
//!
//! Transport adapters for the chat core: the REST API, the per-conversation
//! WebSocket channel, bearer-token authentication, and the mapping from the
//! chat error taxonomy to HTTP responses.
//!
//! ```no_run
//! # async fn demo(state: tether_gateway::GatewayState) -> std::io::Result<()> {
//! let app = tether_gateway::create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7070").await?;
//! axum::serve(listener, app).await
//! # }
//! ```

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use state::GatewayState;

use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, Router};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let arc_state = Arc::new(state);

    let authenticated = Router::new()
        .merge(rest::create_rest_routes())
        .merge(websocket::create_websocket_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            arc_state.clone(),
            middleware::auth_middleware,
        ));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .route("/health", get(rest::health::health_check))
        .merge(authenticated)
        .with_state(arc_state)
        .layer(middleware::create_cors_middleware())
        .layer(middleware::create_trace_middleware())
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    #[cfg(debug_assertions)]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            paths(
                rest::health::health_check,
                rest::conversation::list_conversations,
                rest::conversation::open_conversation,
                rest::conversation::mark_read,
                rest::message::list_messages,
                rest::message::send_message,
            ),
            components(
                schemas(
                    rest::ErrorResponse,
                    rest::health::HealthResponse,
                    rest::conversation::ConversationResponse,
                    rest::conversation::MarkReadResponse,
                    rest::message::MessageResponse,
                    rest::message::SendMessageRequest,
                )
            ),
            tags(
                (name = "Health", description = "Liveness"),
                (name = "Conversations", description = "Two-party conversations"),
                (name = "Messages", description = "Messages and delivery status"),
            )
        )]
        struct ApiDoc;

        router = router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
}
