//! NavCore: Context Resolution + Reactive State Store
//!
//! A Rust/WASM implementation of the core behind the embeddable navigation
//! header. The host page loads the widget, which has to work out which
//! application context the current address and DOM represent, gather the
//! identifying tags for it from several feeds, and hand every rendering
//! component a consistent view of that state.
//!
//! # Architecture
//!
//! ## Resolution
//! - `tags/` - Tag merging by source precedence, `{tag}` URL templates
//! - `context/` - Address canonicalization, pattern compilation, first-match context matcher
//! - `dom/` - Arena DOM with mutation records, CSS selector subset, DOM tag extractor
//!
//! ## State
//! - `store/` - Reactive slot store, derived slots, readiness gate
//! - `lifecycle/` - Context lifecycle controller, mutation circuit breaker
//!
//! ## Ambient
//! - `config.rs` - Configuration document and load-time lint
//! - `auth.rs` - Auth result model and context authorisation check
//! - `logging.rs` - `log` sink writing to the browser console
//! - `wasm.rs` - JS bindings (`NavCore`)
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { NavCore } from 'navcore';
//!
//! await init();
//!
//! const core = new NavCore(config);
//! core.subscribe((slot, value) => rerender(slot));
//! core.navigate(location.href, document.body.outerHTML);
//!
//! const { isReady, state } = core.readyState(['context', 'tags'], ['auth']);
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod dom;
pub mod lifecycle;
pub mod logging;
pub mod store;
pub mod tags;
pub mod wasm;

pub use auth::*;
pub use config::*;
pub use context::*;
pub use dom::*;
pub use lifecycle::*;
pub use store::*;
pub use tags::*;
pub use wasm::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook and console logging
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init(log::LevelFilter::Info);
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("navcore v{}", env!("CARGO_PKG_VERSION"))
}
