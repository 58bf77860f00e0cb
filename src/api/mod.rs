//! Chart editor WASM API
//!
//! - `helpers`: console logging, argument decoding and error conversion
//! - `core`: the exported functions, operating on the editor held in WASM memory

pub mod helpers;
pub mod core;

pub use core::*;
