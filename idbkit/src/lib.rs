//! # idbkit
//!
//! A handle over one named, versioned IndexedDB database. The schema is declared up front,
//! the connection opens lazily, and each operation runs in its own single-store transaction
//! and resolves with its result.
//!
//! ## Backends
//!
//! - `indexeddb` (wasm32 only): the browser's IndexedDB
//! - `memory` (default): an in-process engine with the same semantics, for native code and tests
//!
//! ## Example
//!
//! ```rust
//! # use idbkit::{json, IndexDescriptor, Key, MemoryBackend, Store, StoreConfig, StoreDescriptor};
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::new("library")
//!     .version(1)
//!     .store(StoreDescriptor::new("albums").auto_increment().index(IndexDescriptor::new("by_year", "year")));
//!
//! let store = Store::new(MemoryBackend::new(), config)?;
//! store.open().await?;
//!
//! let key = store.add("albums", json!({ "name": "Origin of Symmetry", "year": "2001" }), None).await?;
//! assert_eq!(key, Key::from(1));
//! assert_eq!(store.get_all_by_index("albums", "by_year", &Key::from("2001")).await?.len(), 1);
//! # Ok(())
//! # }
//! ```

pub use idbkit_core as core;

pub use idbkit_core::{
    action_debug, action_warn, notice_info, Backend, Connection, CursorDirection, IndexDescriptor, IndexParams, Item, Key, KeyPath,
    LifecycleState, SchemaBuilder, Store, StoreConfig, StoreDescriptor, StoreError, StoreParams, Transaction, TransactionMode,
    MAX_SAFE_INTEGER,
};
pub use serde_json::{self, json};

#[cfg(feature = "memory")]
pub use idbkit_storage_memory as memory;
#[cfg(feature = "memory")]
pub use idbkit_storage_memory::MemoryBackend;

#[cfg(all(feature = "indexeddb", target_arch = "wasm32"))]
pub use idbkit_storage_indexeddb_wasm as indexeddb;
#[cfg(all(feature = "indexeddb", target_arch = "wasm32"))]
pub use idbkit_storage_indexeddb_wasm::IndexedDbBackend;

/// A [`Store`] over the in-process engine
#[cfg(feature = "memory")]
pub type MemoryStore = Store<MemoryBackend>;

/// A [`Store`] over the browser's IndexedDB
#[cfg(all(feature = "indexeddb", target_arch = "wasm32"))]
pub type IndexedDbStore = Store<IndexedDbBackend>;
