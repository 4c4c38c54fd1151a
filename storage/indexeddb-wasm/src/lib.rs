//! idbkit backend for the browser's IndexedDB.
//!
//! Every request is turned into a future by listening for its DOM events; errors keep their
//! `DOMException` name.

mod cursor;
pub mod database;
mod error;
mod schema;
mod transaction;
mod util;
mod value;

pub use database::{IdbConnection, IndexedDbBackend};
pub use transaction::IndexedDbTransaction;

/// Route panics and `tracing` output to the browser console
pub fn install_console_logging() {
    console_error_panic_hook::set_once();
    let _ = tracing_wasm::try_set_as_global_default();
}
