use tokio::sync::mpsc;
use uuid::Uuid;

use crate::broker::message::Message;

pub type SessionId = Uuid;

/// One live connection's delivery endpoint in the fanout system.
///
/// Each session is uniquely identified by an `id` and owns the sending half
/// of a bounded outbox. The transport holds the receiving half and streams
/// it to the socket; dropping that half is the session's cancellation
/// signal.
#[derive(Debug)]
pub struct ClientSession {
    /// Unique identifier for the session (one per connection subscription).
    pub id: SessionId,

    /// Bounded buffer of undelivered messages awaiting consumption.
    pub outbox: mpsc::Sender<Message>,
}

impl ClientSession {
    /// Creates a session with an outbox of the given capacity, returning the
    /// receiving half for the transport to consume.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (outbox, rx) = mpsc::channel(capacity);
        (
            Self {
                id: Uuid::new_v4(),
                outbox,
            },
            rx,
        )
    }
}
