//! Named fire-and-forget broadcast channels, independent of row changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Channel used to wake courtside clients.
pub const ROUND_UPDATES: &str = "round_updates";
/// Sent on [`ROUND_UPDATES`] when a round starts; payload `{ "roundId": .. }`.
pub const ROUND_STARTED: &str = "round_started";

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub event: String,
    pub payload: serde_json::Value,
}

/// Registry of named channels. Cloning shares the registry.
#[derive(Clone, Debug, Default)]
pub struct BroadcastHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<BroadcastMessage>>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the channel with this name.
    pub fn channel(&self, name: &str) -> BroadcastChannel {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let tx = channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone();
        BroadcastChannel {
            name: name.to_string(),
            tx,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BroadcastChannel {
    name: String,
    tx: broadcast::Sender<BroadcastMessage>,
}

impl BroadcastChannel {
    /// Best effort: returns how many listeners were reached (possibly zero).
    pub fn send(&self, event: &str, payload: serde_json::Value) -> usize {
        let reached = self
            .tx
            .send(BroadcastMessage {
                event: event.to_string(),
                payload,
            })
            .unwrap_or(0);
        log::debug!("{}/{} reached {} listeners", self.name, event, reached);
        reached
    }

    /// Listen for one event name on this channel.
    pub fn on(&self, event: &str) -> Listener {
        Listener {
            rx: self.tx.subscribe(),
            event: event.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Listener {
    rx: broadcast::Receiver<BroadcastMessage>,
    event: String,
}

impl Listener {
    /// Wait for the next message with the listened-for event name.
    pub async fn recv(&mut self) -> Option<serde_json::Value> {
        loop {
            match self.rx.recv().await {
                Ok(msg) if msg.event == self.event => return Some(msg.payload),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// True if at least one matching message was buffered; drains the buffer.
    pub fn drain(&mut self) -> bool {
        let mut woke = false;
        loop {
            match self.rx.try_recv() {
                Ok(msg) => woke |= msg.event == self.event,
                Err(broadcast::error::TryRecvError::Lagged(_)) => woke = true,
                Err(_) => return woke,
            }
        }
    }
}
