//! # idbkit-core
//!
//! A thin sequencing layer over an IndexedDB-shaped key/value engine. The [`Store`] handle
//! owns a lazily opened connection to one named, versioned database and turns each call into a
//! short-lived transaction against a single object store.
//!
//! The engine itself sits behind the [`backend`] traits. `idbkit-storage-indexeddb-wasm` talks to
//! the browser; `idbkit-storage-memory` provides the same semantics in-process.
//!
//! ```rust,ignore
//! let config = StoreConfig::new("notes")
//!     .version(1)
//!     .store(StoreDescriptor::new("notes").auto_increment().index(IndexDescriptor::new("by_title", "title")));
//! let store = Store::new(backend, config)?;
//! store.open().await?;
//! let key = store.add("notes", json!({ "title": "hello" }), None).await?;
//! ```

pub mod backend;
mod callback;
pub mod config;
pub mod error;
pub mod key;
mod schema;
pub mod store;
pub mod task;
pub mod util;

pub use backend::{Backend, Connection, CursorDirection, Item, SchemaBuilder, Transaction, TransactionMode};
pub use config::{IndexDescriptor, IndexParams, StoreConfig, StoreDescriptor, StoreParams};
pub use error::StoreError;
pub use key::{Key, KeyPath, MAX_SAFE_INTEGER};
pub use store::{LifecycleState, Store};
