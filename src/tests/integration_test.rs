use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::protocol::Message as WsMessage;

use crate::bridge::{InMemoryBus, MessageBus};
use crate::broker::ChatRegistry;
use crate::broker::message::ChatId;
use crate::persistence::{ChatStore, MemoryChatStore};
use crate::transport::websocket::start_websocket_server;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(addr: &'static str) -> (Arc<ChatRegistry>, ChatId) {
    let store: Arc<dyn ChatStore> = Arc::new(MemoryChatStore::new());
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new(64));
    let registry = ChatRegistry::new(store.clone(), bus.clone());
    let chat = store.create_chat("general").await.unwrap();

    let server_registry = registry.clone();
    tokio::spawn(async move {
        start_websocket_server(addr, server_registry, store, bus, 8).await;
    });

    sleep(Duration::from_millis(300)).await;
    (registry, chat.id)
}

async fn connect(addr: &str) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}"))
        .await
        .expect("client connect");
    ws
}

async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(WsMessage::text(value.to_string())).await.unwrap();
}

async fn next_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let frame = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed")
            .expect("websocket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// True when the next frame closes the stream instead of carrying an event.
async fn stream_ends(ws: &mut WsClient) -> bool {
    match timeout(Duration::from_secs(2), ws.next()).await {
        Ok(None) => true,
        Ok(Some(Ok(WsMessage::Close(_)))) => true,
        Ok(Some(other)) => panic!("expected end of stream, got {other:?}"),
        Err(_) => false,
    }
}

#[tokio::test]
async fn fanout_end_to_end() {
    let addr = "127.0.0.1:9301";
    let (registry, chat_id) = start_server(addr).await;

    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    let mut writer = connect(addr).await;

    send_json(&mut alice, json!({"type": "subscribe", "chat_id": chat_id})).await;
    assert_eq!(next_json(&mut alice).await["type"], "subscribed");
    send_json(&mut bob, json!({"type": "subscribe", "chat_id": chat_id})).await;
    assert_eq!(next_json(&mut bob).await["type"], "subscribed");

    // Both subscribers see the published message, exactly once.
    send_json(
        &mut writer,
        json!({"type": "publish", "chat_id": chat_id, "text": "hi"}),
    )
    .await;
    let to_alice = next_json(&mut alice).await;
    assert_eq!(to_alice["text"], "hi");
    assert_eq!(to_alice["chat_id"], chat_id);
    assert_eq!(next_json(&mut bob).await["text"], "hi");

    // Bob leaves; his stream ends and the next message reaches only Alice.
    send_json(&mut bob, json!({"type": "unsubscribe", "chat_id": chat_id})).await;
    assert!(stream_ends(&mut bob).await);

    send_json(
        &mut writer,
        json!({"type": "publish", "chat_id": chat_id, "text": "bye"}),
    )
    .await;
    assert_eq!(next_json(&mut alice).await["text"], "bye");

    // Alice leaves too; the chat's broadcaster is reclaimed.
    send_json(&mut alice, json!({"type": "unsubscribe", "chat_id": chat_id})).await;
    for _ in 0..100 {
        if registry.active_chats() == 0 {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(registry.active_chats(), 0);

    // The chat itself still exists: a new subscriber gets a fresh
    // broadcaster with zero sessions.
    registry.get_or_create(chat_id).await.unwrap();
    assert_eq!(registry.active_chats(), 1);
}

#[tokio::test]
async fn unknown_chat_is_rejected() {
    let addr = "127.0.0.1:9302";
    let (registry, _chat_id) = start_server(addr).await;

    let mut client = connect(addr).await;

    send_json(&mut client, json!({"type": "subscribe", "chat_id": 99})).await;
    let rejection = next_json(&mut client).await;
    assert_eq!(rejection["type"], "error");
    assert!(
        rejection["message"]
            .as_str()
            .unwrap()
            .contains("not found")
    );
    assert_eq!(registry.active_chats(), 0);

    send_json(
        &mut client,
        json!({"type": "publish", "chat_id": 99, "text": "void"}),
    )
    .await;
    let rejection = next_json(&mut client).await;
    assert_eq!(rejection["type"], "error");
}

#[tokio::test]
async fn double_subscribe_is_rejected() {
    let addr = "127.0.0.1:9303";
    let (_registry, chat_id) = start_server(addr).await;

    let mut client = connect(addr).await;

    send_json(&mut client, json!({"type": "subscribe", "chat_id": chat_id})).await;
    assert_eq!(next_json(&mut client).await["type"], "subscribed");

    send_json(&mut client, json!({"type": "subscribe", "chat_id": chat_id})).await;
    let rejection = next_json(&mut client).await;
    assert_eq!(rejection["type"], "error");
    assert_eq!(rejection["message"], "already subscribed");
}
