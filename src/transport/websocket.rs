use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{info, warn};
use tungstenite::protocol::Message as WsMessage;

use std::sync::Arc;

use crate::bridge::MessageBus;
use crate::broker::message::Message;
use crate::broker::{ChatBroadcaster, ChatRegistry};
use crate::client::session::{ClientSession, SessionId};
use crate::persistence::ChatStore;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::Error;

/// The connection's current chat subscription, if any.
struct Subscription {
    broadcaster: Arc<ChatBroadcaster>,
    session_id: SessionId,
}

pub async fn start_websocket_server(
    addr: &str,
    registry: Arc<ChatRegistry>,
    store: Arc<dyn ChatStore>,
    bus: Arc<dyn MessageBus>,
    outbox_capacity: usize,
) {
    let listener = TcpListener::bind(addr).await.expect("Can't bind");

    info!("WebSocket server listening on ws://{addr}");

    while let Ok((stream, _)) = listener.accept().await {
        let registry = registry.clone();
        let store = store.clone();
        let bus = bus.clone();

        tokio::spawn(async move {
            handle_connection(stream, registry, store, bus, outbox_capacity).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    registry: Arc<ChatRegistry>,
    store: Arc<dyn ChatStore>,
    bus: Arc<dyn MessageBus>,
    outbox_capacity: usize,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Writer mailbox shared by the fanout pump and protocol replies.
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut subscription: Option<Subscription> = None;

    while let Some(Ok(frame)) = ws_receiver.next().await {
        if !frame.is_text() {
            continue;
        }
        let text = frame.to_text().unwrap();

        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Subscribe { chat_id }) => {
                if subscription.is_some() {
                    send_frame(
                        &tx,
                        &ServerMessage::Error {
                            message: "already subscribed".to_string(),
                        },
                    );
                    continue;
                }

                match registry.get_or_create(chat_id).await {
                    Ok(broadcaster) => {
                        let (session, outbox) = ClientSession::channel(outbox_capacity);
                        let session_id = session.id;
                        broadcaster.add_client(session).await;
                        spawn(pump_outbox(outbox, tx.clone()));

                        subscription = Some(Subscription {
                            broadcaster,
                            session_id,
                        });
                        send_frame(&tx, &ServerMessage::Subscribed { chat_id });
                        info!(chat_id, %session_id, "client subscribed");
                    }
                    Err(Error::ChatNotFound) => {
                        send_frame(
                            &tx,
                            &ServerMessage::Error {
                                message: format!("chat {chat_id} not found"),
                            },
                        );
                    }
                    Err(err) => {
                        warn!(chat_id, %err, "failed to open chat broadcaster");
                        send_frame(
                            &tx,
                            &ServerMessage::Error {
                                message: "internal server error".to_string(),
                            },
                        );
                    }
                }
            }

            Ok(ClientMessage::Unsubscribe { chat_id }) => {
                let subscribed_here = subscription
                    .as_ref()
                    .is_some_and(|sub| sub.broadcaster.chat_id() == chat_id);
                if !subscribed_here {
                    send_frame(
                        &tx,
                        &ServerMessage::Error {
                            message: format!("not subscribed to chat {chat_id}"),
                        },
                    );
                    continue;
                }
                if let Some(sub) = subscription.take() {
                    sub.broadcaster.remove_client(sub.session_id).await;
                    info!(chat_id, session_id = %sub.session_id, "client unsubscribed");
                }
            }

            Ok(ClientMessage::Publish { chat_id, text }) => {
                match store.add_message(chat_id, &text).await {
                    Ok(message) => {
                        if let Err(err) = bus.publish(chat_id, &message).await {
                            warn!(chat_id, %err, "failed to publish message to bus");
                            send_frame(
                                &tx,
                                &ServerMessage::Error {
                                    message: "internal server error".to_string(),
                                },
                            );
                        }
                    }
                    Err(Error::ChatNotFound) => {
                        send_frame(
                            &tx,
                            &ServerMessage::Error {
                                message: format!("chat {chat_id} not found"),
                            },
                        );
                    }
                    Err(err) => {
                        warn!(chat_id, %err, "failed to store message");
                        send_frame(
                            &tx,
                            &ServerMessage::Error {
                                message: "internal server error".to_string(),
                            },
                        );
                    }
                }
            }

            Err(err) => {
                warn!("Invalid client message: {err} | {text}");
                send_frame(
                    &tx,
                    &ServerMessage::Error {
                        message: "invalid message".to_string(),
                    },
                );
            }
        }
    }

    // Disconnect: deregister exactly once; the broadcaster releases the
    // outbox and, if this was the last session, the chat itself.
    if let Some(sub) = subscription.take() {
        sub.broadcaster.remove_client(sub.session_id).await;
        info!(session_id = %sub.session_id, "client disconnected");
    }
}

/// Streams a session's outbox to the socket, one frame per message. Ends
/// when the broadcaster releases the outbox, closing the client's stream.
async fn pump_outbox(mut outbox: mpsc::Receiver<Message>, tx: mpsc::UnboundedSender<WsMessage>) {
    while let Some(message) = outbox.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(err) => {
                warn!(message_id = message.id, %err, "failed to serialize message");
                continue;
            }
        };
        if tx.send(WsMessage::text(json)).is_err() {
            break;
        }
    }
    let _ = tx.send(WsMessage::Close(None));
}

fn send_frame(tx: &mpsc::UnboundedSender<WsMessage>, frame: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(frame) {
        let _ = tx.send(WsMessage::text(json));
    }
}
