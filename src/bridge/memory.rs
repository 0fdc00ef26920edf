use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tracing::warn;

use super::{BusStream, MessageBus};
use crate::broker::message::{ChatId, Message};
use crate::utils::error::Result;

/// In-process message bus: one broadcast channel per chat, carrying
/// JSON-serialized payloads like the external bus would.
pub struct InMemoryBus {
    channels: Mutex<HashMap<ChatId, broadcast::Sender<String>>>,
    capacity: usize,
}

impl InMemoryBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn sender(&self, chat_id: ChatId) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscriptions for a chat.
    pub fn subscriber_count(&self, chat_id: ChatId) -> usize {
        self.channels
            .lock()
            .unwrap()
            .get(&chat_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Drops a chat's channel, ending every live subscription for it.
    pub fn disconnect(&self, chat_id: ChatId) {
        self.channels.lock().unwrap().remove(&chat_id);
    }

    /// Injects a raw payload, bypassing serialization.
    #[cfg(test)]
    pub(crate) fn send_raw(&self, chat_id: ChatId, payload: &str) {
        let _ = self.sender(chat_id).send(payload.to_string());
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn subscribe(&self, chat_id: ChatId) -> Result<BusStream> {
        let rx = self.sender(chat_id).subscribe();

        let stream = stream::unfold(rx, move |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => match serde_json::from_str::<Message>(&payload) {
                        Ok(message) => return Some((message, rx)),
                        Err(err) => {
                            warn!(chat_id, %err, "dropping undecodable bus payload");
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(chat_id, skipped, "bus subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream.boxed())
    }

    async fn publish(&self, chat_id: ChatId, message: &Message) -> Result<()> {
        let payload = serde_json::to_string(message)?;
        // send() only fails when nobody is subscribed, which is not an error
        // for a fire-and-forget bus.
        let _ = self.sender(chat_id).send(payload);
        Ok(())
    }
}
