//! Bridge configuration
//!
//! Every field is optional when deserialized; missing ones take the defaults
//! the compiled app expects.

use serde::{Deserialize, Serialize};

use crate::consts::{PORT_NAME, STORAGE_KEY};
use crate::error::{BridgeError, Result};

/// What to do when the stored value cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Start empty and leave the bad value until the next write
    #[default]
    Fallback,
    /// Start empty and remove the bad value immediately
    Discard,
}

impl MalformedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedPolicy::Fallback => "fallback",
            MalformedPolicy::Discard => "discard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// LocalStorage key of the slot
    pub storage_key: String,
    /// Name of the runtime's outbound port
    pub port_name: String,
    pub on_malformed: MalformedPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            port_name: PORT_NAME.to_string(),
            on_malformed: MalformedPolicy::Fallback,
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON config object
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(BridgeError::Config)
    }
}
