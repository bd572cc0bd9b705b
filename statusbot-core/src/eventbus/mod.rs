//! src/eventbus/mod.rs
//!
//! In-process event bus. The chat runtime publishes, the dispatch task
//! subscribes, and a `watch` flag carries the shutdown request.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

use statusbot_common::models::IncomingMessage;

/// Events the chat platform delivers to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum BotEvent {
    /// The chat session finished its handshake.
    Ready { user_name: String },

    /// Someone's presence changed in a guild the bot can see.
    PresenceUpdate { guild_id: String, user_id: String },

    ChatMessage(IncomingMessage),
}

impl BotEvent {
    /// Name of the channel handlers subscribe to.
    pub fn event_type(&self) -> &'static str {
        match self {
            BotEvent::Ready { .. } => "ready",
            BotEvent::PresenceUpdate { .. } => "presence.update",
            BotEvent::ChatMessage(_) => "message.create",
        }
    }
}

/// Each subscriber gets its own bounded `mpsc` queue.
///
/// - If a subscriber's buffer fills, `publish` waits for room (backpressure).
/// - Subscribers that dropped their `Receiver` are skipped.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<BotEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

const DEFAULT_BUFFER_SIZE: usize = 10000;

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<BotEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    pub async fn publish(&self, event: BotEvent) {
        let senders = {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.is_closed());
            subs.clone()
        };
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }
}
