//! Storage bridge
//!
//! Loads the persisted data points once at startup, hands them to the
//! runtime, and writes back every collection the runtime emits.

use serde_json::Value;

use crate::config::{BridgeConfig, MalformedPolicy};
use crate::error::Result;
use crate::points::DataPoints;
use crate::runtime::{Runtime, StorePort};
use crate::storage::KeyValueStore;

/// Bridge between a key-value store and the application runtime
#[derive(Debug, Clone)]
pub struct StorageBridge<S> {
    store: S,
    config: BridgeConfig,
}

impl<S: KeyValueStore> StorageBridge<S> {
    /// Bridge with the default key and port name
    pub fn new(store: S) -> Self {
        Self::with_config(store, BridgeConfig::default())
    }

    pub fn with_config(store: S, config: BridgeConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the slot, reporting every failure
    ///
    /// `Ok(None)` means the slot is absent (or holds `null`).
    pub fn read(&self) -> Result<Option<DataPoints>> {
        match self.store.get_item(&self.config.storage_key)? {
            Some(raw) => DataPoints::from_json(&raw),
            None => Ok(None),
        }
    }

    /// Load the initial collection, never failing
    pub fn load(&self) -> DataPoints {
        match self.read() {
            Ok(Some(points)) => {
                log::info!("Loaded {} data points", points.len());
                points
            }
            Ok(None) => {
                log::info!("No stored data points, starting fresh");
                DataPoints::new()
            }
            Err(e) => {
                log::warn!(
                    "Ignoring stored data points ({}), starting fresh: {}",
                    self.config.on_malformed.as_str(),
                    e
                );
                if self.config.on_malformed == MalformedPolicy::Discard {
                    if let Err(e) = self.clear() {
                        log::warn!("Could not discard stored data points: {}", e);
                    }
                }
                DataPoints::new()
            }
        }
    }

    /// Overwrite the slot with `points`
    pub fn save(&self, points: &DataPoints) -> Result<()> {
        let json = points.to_json()?;
        self.store.set_item(&self.config.storage_key, &json)?;
        log::debug!("Data points saved ({} entries)", points.len());
        Ok(())
    }

    /// Validate and persist a payload emitted by the runtime
    pub fn store_payload(&self, payload: Value) -> Result<()> {
        let points = DataPoints::try_from(payload)?;
        self.save(&points)
    }

    /// Remove the slot
    pub fn clear(&self) -> Result<()> {
        self.store.remove_item(&self.config.storage_key)?;
        log::info!("Stored data points cleared");
        Ok(())
    }
}

impl<S: KeyValueStore + 'static> StorageBridge<S> {
    /// Load, initialize the runtime, and subscribe to its port
    ///
    /// Consumes the bridge: the port created here is the only subscriber.
    pub fn launch<R: Runtime>(self, runtime: R) -> Result<R::Instance> {
        let flags = self.load();
        let name = self.config.port_name.clone();
        let port = StorePort::new(name, move |payload| {
            if let Err(e) = self.store_payload(payload) {
                log::error!("Failed to persist data points: {}", e);
            }
        });
        runtime.init(flags, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::storage::MemoryStore;
    use proptest::prelude::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    const KEY: &str = "dataPoints";

    /// Runtime that records its flags and hands the port back to the test
    #[derive(Default)]
    struct RecordingRuntime {
        flags: Rc<RefCell<Option<DataPoints>>>,
    }

    impl Runtime for RecordingRuntime {
        type Instance = StorePort;

        fn init(self, flags: DataPoints, port: StorePort) -> Result<StorePort> {
            *self.flags.borrow_mut() = Some(flags);
            Ok(port)
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Err(BridgeError::Storage("SecurityError".to_string()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(BridgeError::Storage("QuotaExceededError".to_string()))
        }

        fn remove_item(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    fn launch(store: &MemoryStore) -> (StorePort, DataPoints) {
        let runtime = RecordingRuntime::default();
        let flags = runtime.flags.clone();
        let port = StorageBridge::new(store.clone()).launch(runtime).unwrap();
        let flags = flags.borrow_mut().take().unwrap();
        (port, flags)
    }

    #[test]
    fn test_absent_slot_initializes_empty() {
        let store = MemoryStore::new();
        let (port, flags) = launch(&store);
        assert!(flags.is_empty());
        assert_eq!(port.name(), "storeDataPoints");
        // Loading never writes
        assert!(store.is_empty());
    }

    #[test]
    fn test_stored_value_is_loaded() {
        let store = MemoryStore::with_item(KEY, r#"[{"id":1}]"#);
        let (_port, flags) = launch(&store);
        assert_eq!(flags.records(), &[json!({"id": 1})]);
    }

    #[test]
    fn test_stored_null_initializes_empty() {
        let store = MemoryStore::with_item(KEY, "null");
        let (_port, flags) = launch(&store);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_malformed_value_falls_back_to_empty() {
        let store = MemoryStore::with_item(KEY, "{not json");
        let (_port, flags) = launch(&store);
        assert!(flags.is_empty());
        // Fallback keeps the bad value until the next write
        assert_eq!(store.get_item(KEY).unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn test_malformed_value_discarded() {
        let store = MemoryStore::with_item(KEY, r#"{"id":1}"#);
        let config = BridgeConfig {
            on_malformed: MalformedPolicy::Discard,
            ..Default::default()
        };
        let bridge = StorageBridge::with_config(store.clone(), config);
        assert!(bridge.load().is_empty());
        assert!(store.get_item(KEY).unwrap().is_none());
    }

    #[test]
    fn test_read_reports_malformed() {
        let bridge = StorageBridge::new(MemoryStore::with_item(KEY, "{not json"));
        assert!(matches!(bridge.read(), Err(BridgeError::Malformed(_))));
    }

    #[test]
    fn test_storage_read_failure_falls_back_to_empty() {
        let bridge = StorageBridge::new(FailingStore);
        assert!(bridge.load().is_empty());
    }

    #[test]
    fn test_payload_is_written_verbatim() {
        let store = MemoryStore::new();
        let (mut port, _flags) = launch(&store);
        port.send(json!([{"id": 2}]));
        assert_eq!(store.get_item(KEY).unwrap().as_deref(), Some(r#"[{"id":2}]"#));
    }

    #[test]
    fn test_last_write_wins() {
        let store = MemoryStore::with_item(KEY, r#"[{"id":0}]"#);
        let (mut port, _flags) = launch(&store);
        port.send(json!([{"id": 1}, {"id": 2}, {"id": 3}]));
        port.send(json!([{"id": 4}]));
        assert_eq!(store.get_item(KEY).unwrap().as_deref(), Some(r#"[{"id":4}]"#));
    }

    #[test]
    fn test_repeated_payload_is_idempotent() {
        let store = MemoryStore::new();
        let (mut port, _flags) = launch(&store);
        port.send(json!([{"id": 5}]));
        let first = store.get_item(KEY).unwrap();
        port.send(json!([{"id": 5}]));
        assert_eq!(store.get_item(KEY).unwrap(), first);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_non_array_payload_is_not_written() {
        let store = MemoryStore::with_item(KEY, "[]");
        let (mut port, _flags) = launch(&store);
        port.send(json!({"id": 1}));
        assert_eq!(store.get_item(KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_deeply_nested_payload_survives_restart() {
        let mut payload = json!({"id": 1});
        for _ in 0..200 {
            payload = json!([payload]);
        }
        let payload = json!([payload]);

        let store = MemoryStore::new();
        let (mut port, _flags) = launch(&store);
        port.send(payload.clone());

        let (_port, flags) = launch(&store);
        assert_eq!(Value::from(flags), payload);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let bridge = StorageBridge::new(FailingStore);
        let err = bridge.store_payload(json!([])).unwrap_err();
        assert!(matches!(err, BridgeError::Storage(_)));
    }

    #[test]
    fn test_custom_key_and_port() {
        let store = MemoryStore::new();
        let config = BridgeConfig {
            storage_key: "points_v2".to_string(),
            port_name: "savePoints".to_string(),
            ..Default::default()
        };
        let runtime = RecordingRuntime::default();
        let mut port = StorageBridge::with_config(store.clone(), config)
            .launch(runtime)
            .unwrap();
        assert_eq!(port.name(), "savePoints");
        port.send(json!([1]));
        assert_eq!(store.get_item("points_v2").unwrap().as_deref(), Some("[1]"));
        assert!(store.get_item(KEY).unwrap().is_none());
    }

    #[test]
    fn test_runtime_init_error_propagates() {
        struct BrokenRuntime;

        impl Runtime for BrokenRuntime {
            type Instance = ();

            fn init(self, _flags: DataPoints, _port: StorePort) -> Result<()> {
                Err(BridgeError::Runtime("no ports".to_string()))
            }
        }

        let result = StorageBridge::new(MemoryStore::new()).launch(BrokenRuntime);
        assert!(matches!(result, Err(BridgeError::Runtime(_))));
    }

    fn arb_record() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9 ]{0,8}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_saved_points_reload_identically(
            records in prop::collection::vec(arb_record(), 0..8)
        ) {
            let store = MemoryStore::new();
            let bridge = StorageBridge::new(store.clone());
            let points = DataPoints::from_records(records);

            bridge.save(&points).unwrap();
            let first = store.get_item(KEY).unwrap().unwrap();
            let reloaded = bridge.read().unwrap().unwrap();
            prop_assert_eq!(&reloaded, &points);

            bridge.save(&reloaded).unwrap();
            prop_assert_eq!(store.get_item(KEY).unwrap().unwrap(), first);
        }
    }
}
