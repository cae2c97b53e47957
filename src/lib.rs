mod api;
mod app;
mod components;
mod editor;
mod markdown;
mod models;
mod pages;
mod search;
mod state;
mod util;

use crate::app::App;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(App);
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_env_config_defaults_without_window_env() {
        // The test page defines no `window.ENV`, so the fallback applies.
        let cfg = crate::api::EnvConfig::new();
        assert_eq!(cfg.api_url, "http://localhost:8080");
    }

    #[wasm_bindgen_test]
    fn test_api_client_from_env_base_url() {
        let client = crate::api::ApiClient::from_env();
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
