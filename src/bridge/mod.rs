//! The `bridge` module is the seam to the backing publish/subscribe bus
//! that carries messages between processes.
//!
//! Broadcasters consume it through the narrow `MessageBus` trait and never
//! see the bus's wire format: subscriptions yield already-decoded `Message`
//! values, and payloads that fail to decode are dropped inside the adapter.

pub mod memory;
pub use memory::InMemoryBus;


use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::broker::message::{ChatId, Message};
use crate::utils::error::Result;

/// Live message feed for one chat. Open until dropped.
pub type BusStream = Pin<Box<dyn Stream<Item = Message> + Send>>;

/// Topic-scoped publish/subscribe over the backing bus.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Opens a live subscription to one chat's messages. A subscription that
    /// dies mid-life ends the stream; it is never re-established here.
    async fn subscribe(&self, chat_id: ChatId) -> Result<BusStream>;

    /// Serializes and sends one message to a chat's channel. Failure
    /// propagates to the caller of the write path.
    async fn publish(&self, chat_id: ChatId, message: &Message) -> Result<()>;
}
