mod api;
mod app;
mod attachments;
mod autosave;
mod components;
mod config;
mod dnd;
mod drafts;
mod editor;
mod folders;
mod loader;
mod models;
mod pages;
mod search;
mod slash;
mod state;
mod storage;
mod tags;
mod util;

use crate::app::App;
use crate::config::EnvConfig;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

fn init_logging(cfg: &EnvConfig) {
    // A second init (hot reload) fails harmlessly.
    if console_log::init_with_level(cfg.log_level).is_ok() {
        log::info!("poznote-web {} starting", env!("CARGO_PKG_VERSION"));
    }
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_env_config_defaults_without_window_env() {
        let cfg = EnvConfig::new();
        assert_eq!(cfg.load_timeout_ms, EnvConfig::default().load_timeout_ms);
    }

    #[wasm_bindgen_test]
    fn test_push_url_updates_location_search() {
        util::push_url("?note=42&workspace=Poznote");
        let search = web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default();
        assert_eq!(loader::query_param(&search, "note").as_deref(), Some("42"));
    }
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    init_logging(&EnvConfig::new());
    mount_to_body(App);
}
