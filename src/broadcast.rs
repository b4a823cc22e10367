//! Per-code broadcast channels.
//!
//! Rooms and polls each get their own `tokio::sync::broadcast` channel,
//! created lazily when the first subscriber or publisher touches the topic.
//! Poll display clients subscribe to a separate topic so the masked payload
//! variant never reaches them mixed with the host view.

use crate::protocol::ServerMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const CHANNEL_CAPACITY: usize = 100;

pub fn room_topic(code: &str) -> String {
    format!("room:{code}")
}

pub fn poll_topic(poll_id: &str) -> String {
    format!("poll:{poll_id}")
}

pub fn poll_display_topic(poll_id: &str) -> String {
    format!("poll:{poll_id}:display")
}

/// Registry of topic name -> broadcast sender
#[derive(Clone, Default)]
pub struct Topics {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<ServerMessage>>>>,
}

impl Topics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic, creating its channel on first touch
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<ServerMessage> {
        let mut channels = self.channels.write().await;
        channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish to a topic. No subscribers (or no channel yet) is fine.
    pub async fn publish(&self, topic: &str, msg: ServerMessage) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(topic) {
            let _ = tx.send(msg);
        }
    }
}
