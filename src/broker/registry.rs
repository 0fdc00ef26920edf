use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::bridge::MessageBus;
use crate::broker::broadcaster::ChatBroadcaster;
use crate::broker::message::ChatId;
use crate::persistence::ChatStore;
use crate::utils::error::{Error, Result};

/// Owns the chat → broadcaster map and is the only authority on whether a
/// chat is currently broadcasting.
///
/// Explicit process-wide state: constructed once at startup, handed to the
/// transport, torn down by `shutdown`. The map is only ever touched under
/// its mutex, and the lock is never held across an await.
pub struct ChatRegistry {
    store: Arc<dyn ChatStore>,
    bus: Arc<dyn MessageBus>,
    broadcasters: Mutex<HashMap<ChatId, Arc<ChatBroadcaster>>>,
}

impl ChatRegistry {
    pub fn new(store: Arc<dyn ChatStore>, bus: Arc<dyn MessageBus>) -> Arc<Self> {
        Arc::new(Self {
            store,
            bus,
            broadcasters: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the chat's live broadcaster, creating one if the chat exists
    /// but is not broadcasting yet.
    ///
    /// Fails with `ChatNotFound` for absent chats; nothing is constructed
    /// and no bus subscription is opened in that case. A subscribe failure
    /// is fatal to this call and propagates to the caller.
    pub async fn get_or_create(self: &Arc<Self>, chat_id: ChatId) -> Result<Arc<ChatBroadcaster>> {
        if let Some(existing) = self.broadcasters.lock().unwrap().get(&chat_id) {
            return Ok(existing.clone());
        }

        if !self.store.chat_exists(chat_id).await? {
            return Err(Error::ChatNotFound);
        }

        let stream = self.bus.subscribe(chat_id).await?;

        let mut broadcasters = self.broadcasters.lock().unwrap();
        if let Some(existing) = broadcasters.get(&chat_id) {
            // Lost the insert race while awaiting; `stream` is dropped here,
            // closing the extra subscription, and everyone gets the winner.
            return Ok(existing.clone());
        }

        let broadcaster = ChatBroadcaster::start(chat_id, stream, self.clone());
        broadcasters.insert(chat_id, broadcaster.clone());
        info!(chat_id, "chat broadcaster started");
        Ok(broadcaster)
    }

    /// Removes a chat's entry. Called by a broadcaster that went idle or
    /// lost its bus subscription; fails with `ChatNotFound` if the entry is
    /// already gone (guards against duplicate idle signals).
    pub fn close(&self, chat_id: ChatId) -> Result<()> {
        match self.broadcasters.lock().unwrap().remove(&chat_id) {
            Some(_) => {
                info!(chat_id, "chat broadcaster released");
                Ok(())
            }
            None => Err(Error::ChatNotFound),
        }
    }

    /// Top-down shutdown: drains the map and stops every broadcaster.
    pub async fn shutdown(&self) {
        let drained: Vec<(ChatId, Arc<ChatBroadcaster>)> = {
            let mut broadcasters = self.broadcasters.lock().unwrap();
            broadcasters.drain().collect()
        };

        for (chat_id, broadcaster) in drained {
            broadcaster.shutdown().await;
            debug!(chat_id, "chat broadcaster stopped");
        }
    }

    /// Number of chats currently broadcasting.
    pub fn active_chats(&self) -> usize {
        self.broadcasters.lock().unwrap().len()
    }
}
