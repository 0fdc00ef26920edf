//! Per-chat fanout worker pair.
//!
//! Each active chat runs two tasks. The subscriber task pulls the chat's
//! bus stream and forwards every message into a command channel. The
//! coordinator task is the single owner of the live session set and applies
//! all add/remove/deliver operations in arrival order, so the set needs no
//! lock of its own. The coordinator exits, releasing the chat in the
//! registry, exactly when a removal leaves zero sessions; the subscriber
//! exits on the coordinator's shutdown signal or when the bus stream ends.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::bridge::BusStream;
use crate::broker::message::{ChatId, Message};
use crate::broker::registry::ChatRegistry;
use crate::client::session::{ClientSession, SessionId};

/// Capacity of the per-chat command channel shared by the transport and the
/// subscriber task.
const COMMAND_BUFFER: usize = 64;

enum Command {
    AddClient(ClientSession),
    RemoveClient(SessionId),
    Deliver(Message),
    Shutdown,
}

/// Handle to one chat's fanout worker pair. Owned by the registry; cloned
/// out to the transport for the duration of a subscription.
pub struct ChatBroadcaster {
    chat_id: ChatId,
    commands: mpsc::Sender<Command>,
}

impl ChatBroadcaster {
    /// Spawns the coordinator and subscriber tasks for `chat_id`, consuming
    /// an already-open bus subscription.
    pub(super) fn start(
        chat_id: ChatId,
        stream: BusStream,
        registry: Arc<ChatRegistry>,
    ) -> Arc<Self> {
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(coordinator_loop(chat_id, command_rx, shutdown_tx, registry));
        tokio::spawn(subscriber_loop(chat_id, stream, commands.clone(), shutdown_rx));

        Arc::new(Self { chat_id, commands })
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Registers a session; it is visible to the next delivered message.
    pub async fn add_client(&self, session: ClientSession) {
        if self.commands.send(Command::AddClient(session)).await.is_err() {
            // Broadcaster already terminated; the session's outbox was
            // dropped with the command, so the caller's stream just ends.
            debug!(chat_id = self.chat_id, "add_client after shutdown");
        }
    }

    /// Deregisters a session. A no-op if it was never added.
    pub async fn remove_client(&self, session_id: SessionId) {
        if self
            .commands
            .send(Command::RemoveClient(session_id))
            .await
            .is_err()
        {
            debug!(chat_id = self.chat_id, "remove_client after shutdown");
        }
    }

    /// Asks both loops to stop. Used for top-down shutdown; idle detection
    /// tears the pair down without it.
    pub(super) async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

/// Serializes every mutation of the session set and fans messages out.
async fn coordinator_loop(
    chat_id: ChatId,
    mut commands: mpsc::Receiver<Command>,
    shutdown: watch::Sender<bool>,
    registry: Arc<ChatRegistry>,
) {
    let mut sessions: HashMap<SessionId, ClientSession> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::AddClient(session) => {
                info!(
                    chat_id,
                    session_id = %session.id,
                    total = sessions.len() + 1,
                    "client joined chat"
                );
                sessions.insert(session.id, session);
            }

            Command::RemoveClient(session_id) => {
                if sessions.remove(&session_id).is_none() {
                    continue;
                }
                info!(
                    chat_id,
                    session_id = %session_id,
                    remaining = sessions.len(),
                    "client left chat"
                );

                if sessions.is_empty() {
                    if let Err(err) = registry.close(chat_id) {
                        debug!(chat_id, %err, "chat already released");
                    }
                    break;
                }
            }

            Command::Deliver(message) => {
                for session in sessions.values() {
                    match session.outbox.try_send(message.clone()) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            // Slow consumer: drop for this session only,
                            // never retried, never blocking the others.
                            debug!(
                                chat_id,
                                session_id = %session.id,
                                message_id = message.id,
                                "outbox full, dropping message"
                            );
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            debug!(chat_id, session_id = %session.id, "outbox closed");
                        }
                    }
                }
            }

            Command::Shutdown => {
                if let Err(err) = registry.close(chat_id) {
                    debug!(chat_id, %err, "chat already released");
                }
                break;
            }
        }
    }

    // Dropping the sessions map closes every remaining outbox, ending the
    // corresponding client streams.
    let _ = shutdown.send(true);
    debug!(chat_id, "coordinator stopped");
}

/// Pulls the bus subscription and forwards messages to the coordinator.
async fn subscriber_loop(
    chat_id: ChatId,
    mut stream: BusStream,
    commands: mpsc::Sender<Command>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            next = stream.next() => match next {
                Some(message) => {
                    if commands.send(Command::Deliver(message)).await.is_err() {
                        break;
                    }
                }
                None => {
                    // Mid-life subscription failure: release the chat so a
                    // later get_or_create rebuilds it from scratch.
                    warn!(chat_id, "bus subscription ended, shutting down chat");
                    let _ = commands.send(Command::Shutdown).await;
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
    debug!(chat_id, "subscriber stopped");
}
