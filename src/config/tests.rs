use serial_test::serial;

use super::load_config;
use super::settings::Settings;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.log.level, "info");
    assert_eq!(settings.fanout.outbox_capacity, 32);
    assert_eq!(settings.fanout.bus_capacity, 256);
    assert_eq!(settings.store.path, "chatcast_db");
}

#[test]
#[serial]
fn load_config_falls_back_to_defaults() {
    let settings = load_config().unwrap();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    temp_env::with_vars(
        [
            ("SERVER_HOST", Some("0.0.0.0")),
            ("SERVER_PORT", Some("9090")),
            ("LOG_LEVEL", Some("debug")),
        ],
        || {
            let settings = load_config().unwrap();
            assert_eq!(settings.server.host, "0.0.0.0");
            assert_eq!(settings.server.port, 9090);
            assert_eq!(settings.log.level, "debug");
            // Untouched sections keep their defaults.
            assert_eq!(settings.store.path, "chatcast_db");
        },
    );
}
