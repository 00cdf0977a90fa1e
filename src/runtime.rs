//! Application runtime seam
//!
//! The runtime is an external collaborator: it takes the loaded data points
//! as flags and reports every updated collection through a single port.

use serde_json::Value;

use crate::error::Result;
use crate::points::DataPoints;

/// Something that can be started with data point flags
pub trait Runtime {
    /// Handle returned once the runtime is mounted
    type Instance;

    /// Construct and mount the runtime
    ///
    /// `port` is the only subscriber of the runtime's outbound channel.
    /// Implementations must keep it alive for as long as they emit.
    fn init(self, flags: DataPoints, port: StorePort) -> Result<Self::Instance>;
}

/// Single-consumer outbound channel with its handler fixed at construction
pub struct StorePort {
    name: String,
    handler: Box<dyn FnMut(Value)>,
}

impl StorePort {
    pub fn new(name: impl Into<String>, handler: impl FnMut(Value) + 'static) -> Self {
        Self {
            name: name.into(),
            handler: Box::new(handler),
        }
    }

    /// Port name the runtime exposes (e.g. `storeDataPoints`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver one payload, running the handler to completion
    pub fn send(&mut self, payload: Value) {
        (self.handler)(payload);
    }
}

impl std::fmt::Debug for StorePort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorePort")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
