use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, logging, the fanout core, and the
/// chat store.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub log: LogSettings,
    pub fanout: FanoutSettings,
    pub store: StoreSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Configuration settings for the fanout core.
///
/// Controls the per-session outbox size and the bus channel capacity.
#[derive(Debug, Deserialize, Clone)]
pub struct FanoutSettings {
    pub outbox_capacity: usize,
    pub bus_capacity: usize,
}

/// Chat store configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub path: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub log: Option<PartialLogSettings>,
    pub fanout: Option<PartialFanoutSettings>,
    pub store: Option<PartialStoreSettings>,
}

/// Partial server settings.
#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Partial logging settings.
#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

/// Partial fanout settings.
#[derive(Debug, Deserialize)]
pub struct PartialFanoutSettings {
    pub outbox_capacity: Option<usize>,
    pub bus_capacity: Option<usize>,
}

/// Partial store settings.
#[derive(Debug, Deserialize)]
pub struct PartialStoreSettings {
    pub path: Option<String>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
            fanout: FanoutSettings {
                outbox_capacity: 32,
                bus_capacity: 256,
            },
            store: StoreSettings {
                path: "chatcast_db".to_string(),
            },
        }
    }
}
