use async_trait::async_trait;
use chrono::Utc;
use sled::Db;

use super::{Chat, ChatStore};
use crate::broker::message::{ChatId, Message};
use crate::utils::error::{Error, Result};

const CHATS_TREE: &str = "chats";

/// Sled-backed chat store: one "chats" tree for chat records, one tree per
/// chat for its messages. Keys are big-endian ids so iteration yields
/// insertion order (`Db::generate_id` is monotonic).
pub struct SledChatStore {
    db: Db,
}

impl SledChatStore {
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn chats(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(CHATS_TREE)?)
    }

    fn messages(&self, chat_id: ChatId) -> Result<sled::Tree> {
        Ok(self.db.open_tree(format!("messages:{chat_id}"))?)
    }

    fn load_chat(&self, chat_id: ChatId) -> Result<Chat> {
        let raw = self
            .chats()?
            .get(chat_id.to_be_bytes())?
            .ok_or(Error::ChatNotFound)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[async_trait]
impl ChatStore for SledChatStore {
    async fn create_chat(&self, title: &str) -> Result<Chat> {
        let chat = Chat {
            id: self.db.generate_id()? as ChatId,
            title: title.to_string(),
            created_at: Utc::now(),
        };

        self.chats()?
            .insert(chat.id.to_be_bytes(), serde_json::to_vec(&chat)?)?;
        Ok(chat)
    }

    async fn chat_exists(&self, chat_id: ChatId) -> Result<bool> {
        Ok(self.chats()?.contains_key(chat_id.to_be_bytes())?)
    }

    async fn add_message(&self, chat_id: ChatId, text: &str) -> Result<Message> {
        if !self.chat_exists(chat_id).await? {
            return Err(Error::ChatNotFound);
        }

        let message = Message {
            id: self.db.generate_id()? as i64,
            chat_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };

        self.messages(chat_id)?
            .insert(message.id.to_be_bytes(), serde_json::to_vec(&message)?)?;
        Ok(message)
    }

    async fn get_with_messages(&self, chat_id: ChatId) -> Result<(Chat, Vec<Message>)> {
        let chat = self.load_chat(chat_id)?;

        let messages = self
            .messages(chat_id)?
            .iter()
            .filter_map(|entry| entry.ok())
            .filter_map(|(_, raw)| serde_json::from_slice(&raw).ok())
            .collect();

        Ok((chat, messages))
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<()> {
        if self.chats()?.remove(chat_id.to_be_bytes())?.is_none() {
            return Err(Error::ChatNotFound);
        }
        self.db.drop_tree(format!("messages:{chat_id}"))?;
        Ok(())
    }
}

impl std::fmt::Debug for SledChatStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledChatStore")
            .field("db", &"sled::Db")
            .finish()
    }
}
