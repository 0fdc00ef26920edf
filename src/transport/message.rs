use serde::{Deserialize, Serialize};

use crate::broker::message::ChatId;

/// Frames a client may send. The chat a connection listens to is chosen by
/// its `subscribe` frame; one subscription per connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { chat_id: ChatId },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { chat_id: ChatId },

    #[serde(rename = "publish")]
    Publish { chat_id: ChatId, text: String },
}

/// Control frames the server sends. Fanout events are not wrapped: each
/// delivered `Message` is serialized directly, one frame per message.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "subscribed")]
    Subscribed { chat_id: ChatId },

    #[serde(rename = "error")]
    Error { message: String },
}
