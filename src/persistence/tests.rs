use super::{ChatStore, MemoryChatStore, SledChatStore};
use crate::utils::error::Error;

async fn exercise_store(store: &dyn ChatStore) {
    let chat = store.create_chat("general").await.unwrap();
    assert_eq!(chat.title, "general");

    assert!(store.chat_exists(chat.id).await.unwrap());
    assert!(!store.chat_exists(chat.id + 1000).await.unwrap());

    let first = store.add_message(chat.id, "hello").await.unwrap();
    let second = store.add_message(chat.id, "world").await.unwrap();
    assert_eq!(first.chat_id, chat.id);
    assert_ne!(first.id, second.id);

    let (loaded, messages) = store.get_with_messages(chat.id).await.unwrap();
    assert_eq!(loaded.id, chat.id);
    assert_eq!(
        messages.iter().map(|m| m.text.as_str()).collect::<Vec<_>>(),
        vec!["hello", "world"]
    );

    store.delete_chat(chat.id).await.unwrap();
    assert!(!store.chat_exists(chat.id).await.unwrap());
    assert!(matches!(
        store.delete_chat(chat.id).await,
        Err(Error::ChatNotFound)
    ));
}

#[tokio::test]
async fn memory_store_round_trip() {
    let store = MemoryChatStore::new();
    exercise_store(&store).await;
}

#[tokio::test]
async fn sled_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SledChatStore::open(dir.path().to_str().unwrap()).unwrap();
    exercise_store(&store).await;
}

#[tokio::test]
async fn add_message_to_unknown_chat_fails() {
    let store = MemoryChatStore::new();
    assert!(matches!(
        store.add_message(99, "nope").await,
        Err(Error::ChatNotFound)
    ));
}

#[tokio::test]
async fn get_with_messages_for_unknown_chat_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = SledChatStore::open(dir.path().to_str().unwrap()).unwrap();
    assert!(matches!(
        store.get_with_messages(99).await,
        Err(Error::ChatNotFound)
    ));
}

#[tokio::test]
async fn messages_survive_chat_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap().to_string();

    let chat_id = {
        let store = SledChatStore::open(&path).unwrap();
        let chat = store.create_chat("durable").await.unwrap();
        store.add_message(chat.id, "persisted").await.unwrap();
        chat.id
    };

    let store = SledChatStore::open(&path).unwrap();
    let (_, messages) = store.get_with_messages(chat_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "persisted");
}
