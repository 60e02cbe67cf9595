//! Integration tests for configuration provisioning through the Storage
//! port, using both the in-memory mock and the NVS adapter's host backend.

use crate::mock_adapters::MemStorage;

use varsync::adapters::nvs::NvsAdapter;
use varsync::app::ports::{Storage, StorageError};
use varsync::config::{
    self, CONFIG_KEY, ClientConfig, ConfigError, DEVICE_KEY_KEY, load_device_key,
};
use varsync::error::Error;

fn provisioned() -> ClientConfig {
    ClientConfig {
        heartbeat_interval_ms: 5_000,
        retries: 2,
        ..ClientConfig::new("abc-123", "https://sync.example.com/")
    }
}

#[test]
fn provision_then_load_round_trips() {
    let mut nvs = NvsAdapter::new();
    assert!(nvs.initialize());

    let cfg = provisioned();
    cfg.provision(&mut nvs).unwrap();

    assert!(nvs.exists(CONFIG_KEY));
    assert_eq!(load_device_key(&nvs).as_deref(), Ok("abc-123"));

    let loaded = ClientConfig::load(&nvs).unwrap();
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.server_url, "https://sync.example.com");
}

#[test]
fn nothing_stored_yields_defaults() {
    let storage = MemStorage::new();
    assert_eq!(ClientConfig::load(&storage), Ok(ClientConfig::default()));
    assert_eq!(load_device_key(&storage), Err(StorageError::NotFound));
}

#[test]
fn corrupt_config_is_reported() {
    let mut storage = MemStorage::new();
    storage.map.insert(CONFIG_KEY.into(), "{\"device_key\":".into());
    assert_eq!(ClientConfig::load(&storage), Err(ConfigError::Corrupted));
}

#[test]
fn invalid_config_is_never_written() {
    let mut storage = MemStorage::new();
    let cfg = ClientConfig {
        heartbeat_interval_ms: 10,
        ..provisioned()
    };
    assert!(matches!(
        cfg.provision(&mut storage),
        Err(Error::Config(ConfigError::ValidationFailed(_)))
    ));
    assert!(storage.map.is_empty());
}

#[test]
fn storage_write_failure_surfaces() {
    let mut storage = MemStorage::new();
    storage.fail_writes = true;
    assert_eq!(provisioned().save(&mut storage), Err(ConfigError::IoError));
    assert_eq!(
        config::store_device_key(&mut storage, "k"),
        Err(StorageError::WriteFailed)
    );
    assert!(!storage.exists(DEVICE_KEY_KEY));
}
