use thiserror::Error;

/// Errors surfaced by the fanout core and its collaborators.
///
/// `ChatNotFound` is the single not-found sentinel for the whole crate: the
/// store raises it, the registry passes it through, and the transport maps
/// it to a client-visible rejection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("chat not found")]
    ChatNotFound,

    /// The message bus refused a subscribe or publish. Fatal to the
    /// attempted operation; never retried by the core.
    #[error("message bus unavailable: {0}")]
    BusUnavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
