use telenode::config::{ConfigStore, Error, NodeConfig};
use telenode::provisioning::{Reply, handle_request};
use telenode::storage::{ERASED_BYTE, MemoryStorage};

const OFFSET: u32 = 16;

fn config() -> NodeConfig {
    NodeConfig::new("Heimnetz", "geheim 123", "A1B2C3D4", 30).unwrap()
}

#[test]
fn test_blank_storage_is_unconfigured() {
    let mut store = ConfigStore::new(MemoryStorage::<512>::new(), OFFSET);
    assert_eq!(store.load(), Ok(None));
}

#[test]
fn test_save_then_load() {
    let mut store = ConfigStore::new(MemoryStorage::<512>::new(), OFFSET);
    store.save(&config()).unwrap();
    assert_eq!(store.load(), Ok(Some(config())));

    let storage = store.release();
    assert_eq!(&storage.as_slice()[OFFSET as usize..OFFSET as usize + 4], b"TNC1");
    assert!(storage.as_slice()[..OFFSET as usize]
        .iter()
        .all(|&b| b == ERASED_BYTE));
}

#[test]
fn test_save_replaces_previous_record() {
    let mut store = ConfigStore::new(MemoryStorage::<512>::new(), 0);
    store
        .save(&NodeConfig::new("a-much-longer-network-name", "pw", "tok", 5).unwrap())
        .unwrap();
    store.save(&config()).unwrap();
    assert_eq!(store.load(), Ok(Some(config())));
}

#[test]
fn test_clear() {
    let mut store = ConfigStore::new(MemoryStorage::<512>::new(), OFFSET);
    store.save(&config()).unwrap();
    store.clear().unwrap();
    assert_eq!(store.load(), Ok(None));
}

#[test]
fn test_corrupt_payload_is_detected() {
    let mut store = ConfigStore::new(MemoryStorage::<512>::new(), 0);
    store.save(&config()).unwrap();

    let mut storage = store.release();
    // First payload byte, right after the 10-byte header.
    storage.as_mut_slice()[10] ^= 0x20;

    let mut store = ConfigStore::new(storage, 0);
    assert_eq!(store.load(), Err(Error::Corrupt));
}

#[test]
fn test_implausible_length_is_detected() {
    let mut storage = MemoryStorage::<512>::new();
    storage.as_mut_slice()[..6].copy_from_slice(&[b'T', b'N', b'C', b'1', 0xFF, 0x7F]);

    let mut store = ConfigStore::new(storage, 0);
    assert_eq!(store.load(), Err(Error::Corrupt));
}

#[test]
fn test_record_beyond_device_is_storage_error() {
    let mut store = ConfigStore::new(MemoryStorage::<32>::new(), 0);
    assert_eq!(store.save(&config()), Err(Error::Storage));

    let mut store = ConfigStore::new(MemoryStorage::<32>::new(), 30);
    assert_eq!(store.load(), Err(Error::Storage));
}

#[test]
fn test_telemetry_url() {
    let url = config()
        .telemetry_url("https://demo.thingsboard.io/api/v1/")
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://demo.thingsboard.io/api/v1/A1B2C3D4/telemetry"
    );

    let base = format!("https://h/{}", "x".repeat(250));
    assert_eq!(config().telemetry_url(&base), Err(Error::TooLong));
}

#[test]
fn test_provisioned_config_survives_restart() {
    let body = b"wifi_ssid=Heimnetz&wifi_pw=geheim+123&accesstok=A1B2C3D4&pushintervall=30";
    let Reply::Configured { config: submitted, page } =
        handle_request("POST", "/config", body, "192.168.4.2")
    else {
        panic!("form rejected");
    };
    assert!(page.contains("Heimnetz"));
    assert!(!page.contains("geheim"));

    let mut store = ConfigStore::new(MemoryStorage::<512>::new(), OFFSET);
    store.save(&submitted).unwrap();

    let mut rebooted = ConfigStore::new(store.release(), OFFSET);
    assert_eq!(rebooted.load(), Ok(Some(config())));
}
