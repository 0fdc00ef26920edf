use std::sync::Arc;

use chatcast::bridge::{InMemoryBus, MessageBus};
use chatcast::broker::ChatRegistry;
use chatcast::config::load_config;
use chatcast::persistence::{ChatStore, SledChatStore};
use chatcast::transport::websocket::start_websocket_server;
use chatcast::utils::logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let settings = load_config().expect("Failed to load configuration");
    logging::init(&settings.log.level);

    let store: Arc<dyn ChatStore> =
        Arc::new(SledChatStore::open(&settings.store.path).expect("Failed to open chat store"));
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new(settings.fanout.bus_capacity));
    let registry = ChatRegistry::new(store.clone(), bus.clone());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    tokio::select! {
        _ = start_websocket_server(
            &addr,
            registry.clone(),
            store,
            bus,
            settings.fanout.outbox_capacity,
        ) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            registry.shutdown().await;
        }
    }
}
