//! The request surface a storage engine must offer.
//!
//! These traits mirror the IndexedDB object model: a [`Backend`] opens versioned databases,
//! running an upgrade hook against a [`SchemaBuilder`] when the version moves forward; a
//! [`Connection`] hands out [`Transaction`]s scoped to a set of object stores; a transaction
//! issues individual requests and reports when it has settled.
//!
//! Everything is `?Send`: engine handles are single-threaded objects driven by an event loop.

use async_trait::async_trait;
use futures::stream::LocalBoxStream;
use std::fmt;

use crate::config::{IndexDescriptor, StoreParams};
use crate::error::StoreError;
use crate::key::Key;

/// Stored values are opaque JSON documents
pub type Item = serde_json::Value;

/// Runs inside the upgrade transaction. Must not fail the open; errors are its own business.
pub type UpgradeHook = Box<dyn FnOnce(&mut dyn SchemaBuilder)>;

/// Entries produced by a cursor walk, in cursor order
pub type CursorStream<'a> = LocalBoxStream<'a, Result<(Key, Item), StoreError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionMode::ReadOnly => write!(f, "readonly"),
            TransactionMode::ReadWrite => write!(f, "readwrite"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorDirection {
    #[default]
    Next,
    Prev,
}

#[async_trait(?Send)]
pub trait Backend {
    type Connection: Connection;

    /// Open `name` at `version`. When the stored version is lower (or the database does not exist)
    /// `on_upgrade` runs before the open completes.
    async fn open(&self, name: &str, version: u32, on_upgrade: UpgradeHook) -> Result<Self::Connection, StoreError>;

    async fn delete_database(&self, name: &str) -> Result<(), StoreError>;
}

pub trait Connection {
    type Transaction: Transaction;

    fn name(&self) -> String;
    fn version(&self) -> u32;
    fn store_names(&self) -> Vec<String>;
    fn index_names(&self, store: &str) -> Result<Vec<String>, StoreError>;
    fn transaction(&self, stores: &[&str], mode: TransactionMode) -> Result<Self::Transaction, StoreError>;
    fn close(&self);
}

/// Structural changes, only available during an upgrade
pub trait SchemaBuilder {
    fn old_version(&self) -> u32;
    fn new_version(&self) -> u32;
    fn store_names(&self) -> Vec<String>;
    fn index_names(&self, store: &str) -> Result<Vec<String>, StoreError>;
    fn create_object_store(&mut self, name: &str, params: &StoreParams) -> Result<(), StoreError>;
    fn create_index(&mut self, store: &str, index: &IndexDescriptor) -> Result<(), StoreError>;
}

#[async_trait(?Send)]
pub trait Transaction {
    fn mode(&self) -> TransactionMode;

    /// Insert under `key` (or the store's key path / generator when `None`); fails if the key exists.
    /// Resolves with the key actually used.
    async fn add(&self, store: &str, value: &Item, key: Option<&Key>) -> Result<Key, StoreError>;

    /// Insert or overwrite. Resolves with the key actually used.
    async fn put(&self, store: &str, value: &Item, key: Option<&Key>) -> Result<Key, StoreError>;

    async fn get(&self, store: &str, key: &Key) -> Result<Option<Item>, StoreError>;
    async fn delete(&self, store: &str, key: &Key) -> Result<(), StoreError>;
    async fn clear(&self, store: &str) -> Result<(), StoreError>;
    async fn count(&self, store: &str) -> Result<u64, StoreError>;

    /// Every value whose `index` key equals `key`, in index order
    async fn index_get_all(&self, store: &str, index: &str, key: &Key) -> Result<Vec<Item>, StoreError>;

    fn open_cursor(&self, store: &str, direction: CursorDirection) -> Result<CursorStream<'_>, StoreError>;

    /// Roll back everything this transaction has done
    fn abort(&self) -> Result<(), StoreError>;

    /// Resolves once the transaction has committed, or fails if it aborted
    async fn done(&self) -> Result<(), StoreError>;
}
