//! Shared application state for the gateway

use std::sync::Arc;

use tether_auth::IdentityProvider;
use tether_chats::{ChatService, Hub};

/// Everything a handler needs, shared behind an `Arc`.
#[derive(Clone)]
pub struct GatewayState {
    pub chat_service: Arc<ChatService>,
    pub hub: Hub,
    pub identity: Arc<dyn IdentityProvider>,
    /// Outbound frames buffered per WebSocket before the connection is dropped.
    pub connection_buffer: usize,
}

impl GatewayState {
    pub fn new(hub: Hub, identity: Arc<dyn IdentityProvider>, connection_buffer: usize) -> Self {
        Self {
            chat_service: Arc::clone(hub.chat_service()),
            hub,
            identity,
            connection_buffer: connection_buffer.max(1),
        }
    }
}
