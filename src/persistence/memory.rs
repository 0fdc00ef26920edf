use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{Chat, ChatStore};
use crate::broker::message::{ChatId, Message};
use crate::utils::error::{Error, Result};

/// Hash-map chat store, the in-memory stand-in used by tests. Existence
/// semantics match the durable store exactly.
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    chats: HashMap<ChatId, Chat>,
    messages: HashMap<ChatId, Vec<Message>>,
    next_id: i64,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn create_chat(&self, title: &str) -> Result<Chat> {
        let mut inner = self.inner.lock().unwrap();
        let chat = Chat {
            id: inner.next_id(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        inner.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn chat_exists(&self, chat_id: ChatId) -> Result<bool> {
        Ok(self.inner.lock().unwrap().chats.contains_key(&chat_id))
    }

    async fn add_message(&self, chat_id: ChatId, text: &str) -> Result<Message> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.chats.contains_key(&chat_id) {
            return Err(Error::ChatNotFound);
        }

        let message = Message {
            id: inner.next_id(),
            chat_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        inner.messages.entry(chat_id).or_default().push(message.clone());
        Ok(message)
    }

    async fn get_with_messages(&self, chat_id: ChatId) -> Result<(Chat, Vec<Message>)> {
        let inner = self.inner.lock().unwrap();
        let chat = inner.chats.get(&chat_id).cloned().ok_or(Error::ChatNotFound)?;
        let messages = inner.messages.get(&chat_id).cloned().unwrap_or_default();
        Ok((chat, messages))
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.chats.remove(&chat_id).is_none() {
            return Err(Error::ChatNotFound);
        }
        inner.messages.remove(&chat_id);
        Ok(())
    }
}
