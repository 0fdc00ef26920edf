use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one chat, the unit of fanout.
pub type ChatId = i64;

/// A chat message as it travels through the system.
///
/// Constructed once by the store when the message is written, then carried
/// unchanged over the bus and into every subscriber's outbox. Serialized to
/// JSON both on the bus and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: ChatId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
