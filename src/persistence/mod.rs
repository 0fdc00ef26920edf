//! The `persistence` module stores chats and their messages and is the
//! authority on which chats exist.
//!
//! The fanout core consumes it through the `ChatStore` trait only. The
//! durable implementation uses `sled` as an embedded key-value store; a
//! hash-map implementation backs tests.

pub mod memory;
pub mod sled_store;

pub use memory::MemoryChatStore;
pub use sled_store::SledChatStore;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::message::{ChatId, Message};
use crate::utils::error::Result;

/// One chat conversation as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Durable chat storage and the existence authority for the registry.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Creates a chat and assigns its id.
    async fn create_chat(&self, title: &str) -> Result<Chat>;

    /// Whether the chat exists. The registry asks here before building a
    /// broadcaster; nothing else is cached.
    async fn chat_exists(&self, chat_id: ChatId) -> Result<bool>;

    /// Appends a message, assigning its id and timestamp. Fails with
    /// `ChatNotFound` if the chat is absent.
    async fn add_message(&self, chat_id: ChatId, text: &str) -> Result<Message>;

    /// The chat together with its messages in insertion order.
    async fn get_with_messages(&self, chat_id: ChatId) -> Result<(Chat, Vec<Message>)>;

    /// Removes a chat and its messages. Fails with `ChatNotFound` if absent.
    async fn delete_chat(&self, chat_id: ChatId) -> Result<()>;
}
