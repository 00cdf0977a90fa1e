//! Data point collection
//!
//! The records are application-defined and never inspected here. The only
//! structural guarantee is that the collection is a JSON array.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Ordered collection of opaque data point records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataPoints(Vec<Value>);

impl DataPoints {
    /// Create an empty collection
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_records(records: Vec<Value>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn records(&self) -> &[Value] {
        &self.0
    }

    pub fn into_records(self) -> Vec<Value> {
        self.0
    }

    /// Encode as the JSON text stored in the slot
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(BridgeError::Serialize)
    }

    /// Decode stored JSON text
    ///
    /// Returns `None` for the literal `null`, which is treated like an
    /// absent slot.
    pub fn from_json(raw: &str) -> Result<Option<Self>> {
        parse_json::<Option<Self>>(raw).map_err(BridgeError::Malformed)
    }
}

/// Parse JSON text with no nesting limit
///
/// Anything `to_json` writes must read back, however deeply the records nest.
pub(crate) fn parse_json<T: DeserializeOwned>(raw: &str) -> serde_json::Result<T> {
    let mut de = serde_json::Deserializer::from_str(raw);
    de.disable_recursion_limit();
    #[cfg(not(target_arch = "wasm32"))]
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    #[cfg(target_arch = "wasm32")]
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

impl TryFrom<Value> for DataPoints {
    type Error = BridgeError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Array(records) => Ok(Self(records)),
            other => Err(BridgeError::NotAnArray(kind_of(&other))),
        }
    }
}

impl From<DataPoints> for Value {
    fn from(points: DataPoints) -> Self {
        Value::Array(points.0)
    }
}

/// JSON type name, for diagnostics
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
