//! Data Points Bridge - persists a front-end app's data points to LocalStorage
//!
//! Core modules:
//! - `points`: Opaque data point collection and its JSON form
//! - `storage`: Key-value store abstraction (LocalStorage on web)
//! - `bridge`: Load at startup, write back on every runtime update
//! - `runtime`: Application runtime seam and its outbound port
//! - `config`: Storage key, port name, malformed-data policy
//! - `web`: Browser bindings (wasm32 only)

pub mod bridge;
pub mod config;
pub mod error;
pub mod points;
pub mod runtime;
pub mod storage;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use bridge::StorageBridge;
pub use config::{BridgeConfig, MalformedPolicy};
pub use error::{BridgeError, Result};
pub use points::DataPoints;
pub use runtime::{Runtime, StorePort};
pub use storage::{KeyValueStore, MemoryStore};

/// Names shared with the compiled app
pub mod consts {
    /// LocalStorage key of the data point slot
    pub const STORAGE_KEY: &str = "dataPoints";
    /// Outbound port the app emits updated collections on
    pub const PORT_NAME: &str = "storeDataPoints";
}
