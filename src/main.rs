//! Data Points Bridge entry point
//!
//! On the web, boots the globally loaded app against LocalStorage.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    data_points_bridge::web::init_logging();
    log::info!("Data points bridge starting...");

    match data_points_bridge::web::boot_global() {
        Ok(Some(_)) => log::info!("App running!"),
        Ok(None) => log::debug!("No global Elm.Main, waiting for boot()"),
        Err(e) => log::error!("Bridge failed to start: {}", e),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Data points bridge (native) starting...");
    log::info!("LocalStorage is browser-only - build for wasm32 with `trunk serve`");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
