pub mod audio;
pub mod canvas;
pub mod components;
pub mod engine;
pub mod settings;
pub mod state;

use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("sonoscope v{} starting", env!("CARGO_PKG_VERSION"));
    leptos::mount::mount_to_body(components::app::App);
}
