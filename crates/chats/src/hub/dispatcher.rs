//! Single FIFO queue between event producers and the broadcast loop.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::events::BroadcastEvent;
use super::registry::ConnectionRegistry;

/// Producer side of the event queue. Cheap to clone; every clone feeds the same loop.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: mpsc::Sender<BroadcastEvent>,
}

impl EventDispatcher {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<BroadcastEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Enqueue an event, waiting for room if the queue is full.
    /// Returns false if the broadcast loop has stopped.
    pub async fn dispatch(&self, event: BroadcastEvent) -> bool {
        let conversation_id = event.conversation_id;
        match self.sender.send(event).await {
            Ok(()) => true,
            Err(_) => {
                warn!(conversation_id, "broadcast loop is gone, dropping event");
                false
            }
        }
    }
}

/// Outcome of fanning out one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub evicted: usize,
}

/// Sole consumer of the event queue.
pub struct BroadcastLoop {
    registry: ConnectionRegistry,
    events: mpsc::Receiver<BroadcastEvent>,
}

impl BroadcastLoop {
    pub fn new(registry: ConnectionRegistry, events: mpsc::Receiver<BroadcastEvent>) -> Self {
        Self { registry, events }
    }

    /// Process events in queue order until every dispatcher is dropped.
    pub async fn run(mut self) {
        info!("broadcast loop started");
        while let Some(event) = self.events.recv().await {
            self.process(&event).await;
        }
        info!("broadcast loop stopped");
    }

    /// Write one event to every connection on its conversation.
    ///
    /// A connection whose buffer is full or closed is evicted; the others still get the frame.
    pub async fn process(&self, event: &BroadcastEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(err) => {
                error!(conversation_id = event.conversation_id, error = %err, "failed to serialize event");
                return report;
            }
        };

        for (handle, outbound) in self.registry.snapshot(event.conversation_id).await {
            match outbound.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    let reason = match err {
                        mpsc::error::TrySendError::Full(_) => "buffer full",
                        mpsc::error::TrySendError::Closed(_) => "connection closed",
                    };
                    warn!(
                        connection_id = handle.id,
                        conversation_id = handle.conversation_id,
                        user_id = handle.user_id,
                        reason,
                        "evicting connection after failed write"
                    );
                    self.registry.remove(&handle).await;
                    report.evicted += 1;
                }
            }
        }

        debug!(
            conversation_id = event.conversation_id,
            delivered = report.delivered,
            evicted = report.evicted,
            "event broadcast"
        );
        report
    }
}
