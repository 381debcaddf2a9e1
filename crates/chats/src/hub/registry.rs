//! Live connections grouped by conversation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tether_database::{ConversationId, UserId};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

pub type ConnectionId = u64;

/// Identifies one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub conversation_id: ConversationId,
    pub user_id: UserId,
}

struct Registration {
    user_id: UserId,
    outbound: mpsc::Sender<String>,
}

type Rooms = HashMap<ConversationId, HashMap<ConnectionId, Registration>>;

/// Conversation id to the connections open on it.
///
/// One lock guards the whole map and is only held for the map update itself.
/// Dropping a registration drops the registry's sender, which closes the
/// connection's outbound buffer once no snapshot still holds a clone.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    rooms: Arc<Mutex<Rooms>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        outbound: mpsc::Sender<String>,
    ) -> ConnectionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = ConnectionHandle {
            id,
            conversation_id,
            user_id,
        };

        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(conversation_id)
            .or_default()
            .insert(id, Registration { user_id, outbound });

        debug!(connection_id = id, conversation_id, user_id, "connection registered");
        handle
    }

    /// Remove a connection. Returns false if it was already gone.
    pub async fn remove(&self, handle: &ConnectionHandle) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get_mut(&handle.conversation_id) else {
            return false;
        };

        let removed = room.remove(&handle.id).is_some();
        if room.is_empty() {
            rooms.remove(&handle.conversation_id);
        }
        removed
    }

    /// Connections on a conversation at this instant, with their outbound senders.
    pub async fn snapshot(
        &self,
        conversation_id: ConversationId,
    ) -> Vec<(ConnectionHandle, mpsc::Sender<String>)> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(&conversation_id)
            .map(|room| {
                room.iter()
                    .map(|(id, registration)| {
                        (
                            ConnectionHandle {
                                id: *id,
                                conversation_id,
                                user_id: registration.user_id,
                            },
                            registration.outbound.clone(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn connection_count(&self, conversation_id: ConversationId) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.get(&conversation_id).map_or(0, HashMap::len)
    }

    pub async fn total_connections(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.values().map(HashMap::len).sum()
    }
}
