//! Browser bridge for the phase portrait core.
//!
//! `WasmPhasePortrait` owns the selected model, its compiled vector field,
//! the integration settings and the bounded trajectory history. Its methods
//! are split across `system` (model and trajectories) and `analysis`
//! (eigenvectors, equilibria, direction field).

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

// No console off the browser; native test runs stay quiet.
#[cfg(not(target_arch = "wasm32"))]
fn log(_s: &str) {}

// Macro for console.log debugging
macro_rules! console_log {
    ($($t:tt)*) => {
        $crate::log(&format_args!($($t)*).to_string())
    };
}

mod analysis;
mod system;

pub use system::WasmPhasePortrait;
