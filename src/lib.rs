//! Chart Timeline WASM Module
//!
//! Timeline engine for a rhythm-game chart editor: exact beat arithmetic,
//! indexed event sequences for every judge line channel, a tempo map
//! converting beats to seconds, and an undoable edit log.

pub mod models;
pub mod errors;
pub mod config;
pub mod timeline;
pub mod chart;
pub mod undo;
pub mod editor;
pub mod api;

// Re-export commonly used types
pub use chart::{Chart, ChartData, EventChannel, EventTarget, JudgeLine};
pub use config::EngineConfig;
pub use editor::{ChartEditor, EditState, NodeInfo};
pub use errors::{ChartError, ChartResult};
pub use models::easing::{Easing, EasingCurve};
pub use models::time::RationalTime;
pub use timeline::event_list::{IndexedEventList, InsertOutcome};
pub use undo::{EditLog, EditOutcome, EffectFlags, Operation, OperationKind};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    set_panic_hook();
    init_logging();

    log::info!("Chart timeline WASM module initialized");
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}

#[cfg(feature = "console_log")]
fn init_logging() {
    if console_log::init_with_level(log::Level::Debug).is_err() {
        wasm_warn!("logger was already initialized");
    }
}

#[cfg(not(feature = "console_log"))]
fn init_logging() {}
