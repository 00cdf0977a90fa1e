//! Browser bindings
//!
//! `LocalStorage` backs the slot with `window.localStorage`, and `JsRuntime`
//! drives a compiled JS app exposing `init({ flags })` and
//! `app.ports.<name>.subscribe(callback)`.

use std::cell::Cell;

use js_sys::{Function, JSON, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::bridge::StorageBridge;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::points::{DataPoints, parse_json};
use crate::runtime::{Runtime, StorePort};
use crate::storage::KeyValueStore;

/// Render a thrown JS value for diagnostics
fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

fn storage_error(err: JsValue) -> BridgeError {
    BridgeError::Storage(describe(&err))
}

fn runtime_error(context: &str, err: JsValue) -> BridgeError {
    BridgeError::Runtime(format!("{}: {}", context, describe(&err)))
}

thread_local! {
    static BOOTED: Cell<bool> = const { Cell::new(false) };
}

/// Mark the page as booted, false if it already was
fn claim_boot() -> bool {
    BOOTED.with(|booted| !booted.replace(true))
}

/// `JSON.stringify`, `None` when the value has no JSON form
fn stringify(value: &JsValue, context: &str) -> Result<Option<String>> {
    let text = JSON::stringify(value).map_err(|e| runtime_error(context, e))?;
    // undefined, functions and symbols stringify to undefined
    Ok(JsValue::from(text).as_string())
}

/// Install the panic hook and console logger (safe to call twice)
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// `window.localStorage`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    pub fn open() -> Result<Self> {
        let window = web_sys::window().ok_or(BridgeError::Unavailable)?;
        let storage = window
            .local_storage()
            .map_err(storage_error)?
            .ok_or(BridgeError::Unavailable)?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage.get_item(key).map_err(storage_error)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.storage.set_item(key, value).map_err(storage_error)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.storage.remove_item(key).map_err(storage_error)
    }
}

/// A compiled JS application module, e.g. `Elm.Main`
pub struct JsRuntime {
    module: JsValue,
}

impl JsRuntime {
    pub fn new(module: JsValue) -> Self {
        Self { module }
    }

    /// Look up `globalThis.Elm.Main`
    pub fn from_global() -> Option<Self> {
        let global = js_sys::global();
        let elm = Reflect::get(&global, &"Elm".into()).ok()?;
        let main = Reflect::get(&elm, &"Main".into()).ok()?;
        if main.is_undefined() || main.is_null() {
            return None;
        }
        Some(Self::new(main))
    }
}

/// Convert a port payload to JSON
fn payload_to_value(payload: &JsValue) -> Result<serde_json::Value> {
    let text = stringify(payload, "payload not serializable")?
        .ok_or(BridgeError::NotAnArray("undefined"))?;
    parse_json(&text).map_err(BridgeError::Serialize)
}

impl Runtime for JsRuntime {
    type Instance = JsValue;

    fn init(self, flags: DataPoints, mut port: StorePort) -> Result<JsValue> {
        let flags = JSON::parse(&flags.to_json()?).map_err(|e| runtime_error("flags", e))?;
        let options = Object::new();
        Reflect::set(&options, &"flags".into(), &flags).map_err(|e| runtime_error("flags", e))?;

        let init: Function = Reflect::get(&self.module, &"init".into())
            .map_err(|e| runtime_error("init", e))?
            .dyn_into()
            .map_err(|e| runtime_error("init is not a function", e))?;
        let app = init
            .call1(&self.module, &options)
            .map_err(|e| runtime_error("init", e))?;

        let ports = Reflect::get(&app, &"ports".into()).map_err(|e| runtime_error("ports", e))?;
        let channel =
            Reflect::get(&ports, &port.name().into()).map_err(|e| runtime_error("port", e))?;
        if channel.is_undefined() || channel.is_null() {
            return Err(BridgeError::Runtime(format!(
                "app has no port named {}",
                port.name()
            )));
        }
        let subscribe: Function = Reflect::get(&channel, &"subscribe".into())
            .map_err(|e| runtime_error("subscribe", e))?
            .dyn_into()
            .map_err(|e| runtime_error("subscribe is not a function", e))?;

        let closure = Closure::<dyn FnMut(_)>::new(move |payload: JsValue| {
            match payload_to_value(&payload) {
                Ok(value) => port.send(value),
                Err(e) => log::error!("Dropping data points payload: {}", e),
            }
        });
        subscribe
            .call1(&channel, closure.as_ref())
            .map_err(|e| runtime_error("subscribe", e))?;
        // Subscribed for the lifetime of the page
        closure.forget();

        Ok(app)
    }
}

/// Start `module` with persisted data points
///
/// `config` may be `undefined` or an object with any of the
/// `BridgeConfig` fields. Fails if the page has already booted an app.
#[wasm_bindgen]
pub fn boot(module: JsValue, config: JsValue) -> std::result::Result<JsValue, JsValue> {
    init_logging();
    launch(JsRuntime::new(module), &config).map_err(|e| {
        log::error!("Bridge failed to start: {}", e);
        JsValue::from_str(&e.to_string())
    })
}

fn config_from_js(config: &JsValue) -> Result<BridgeConfig> {
    if config.is_undefined() || config.is_null() {
        return Ok(BridgeConfig::default());
    }
    let text = stringify(config, "config")?
        .ok_or_else(|| BridgeError::Runtime("config is not a JSON object".to_string()))?;
    BridgeConfig::from_json(&text)
}

fn launch(runtime: JsRuntime, config: &JsValue) -> Result<JsValue> {
    let config = config_from_js(config)?;
    let store = LocalStorage::open()?;
    if !claim_boot() {
        return Err(BridgeError::AlreadyRunning);
    }
    StorageBridge::with_config(store, config).launch(runtime)
}

/// Boot `globalThis.Elm.Main` with the default config
///
/// `Ok(None)` when no global app is loaded; the host is then expected to
/// call `boot` itself.
pub fn boot_global() -> Result<Option<JsValue>> {
    match JsRuntime::from_global() {
        Some(runtime) => launch(runtime, &JsValue::UNDEFINED).map(Some),
        None => Ok(None),
    }
}
