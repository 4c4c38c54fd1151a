use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::error::StoreError;
use crate::key::KeyPath;

/// Invoked with no arguments once the database is open and ready
pub type InitCallback = Rc<dyn Fn()>;

/// Configuration consumed by [`Store::new`](crate::Store::new) and held for the handle's lifetime.
///
/// Field names follow the engine's own camelCase dictionaries so a configuration can be
/// deserialized straight from JSON or a JS object:
///
/// ```json
/// { "name": "app", "version": 2, "verbose": true,
///   "stores": [{ "name": "notes", "params": { "autoIncrement": true },
///                "indexes": [{ "name": "by_title", "keyPath": "title", "params": { "unique": true } }] }] }
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub verbose: bool,
    /// Only consulted while upgrading to a new version
    #[serde(default)]
    pub stores: Vec<StoreDescriptor>,
    #[serde(skip)]
    pub on_init: Option<InitCallback>,
}

fn default_version() -> u32 { 1 }

impl StoreConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), version: default_version(), verbose: false, stores: Vec::new(), on_init: None }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn store(mut self, store: StoreDescriptor) -> Self {
        self.stores.push(store);
        self
    }

    pub fn on_init(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_init = Some(Rc::new(callback));
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.is_empty() {
            return Err(StoreError::InvalidConfig("database name cannot be empty".into()));
        }
        if self.version == 0 {
            return Err(StoreError::InvalidConfig("version must be a positive integer".into()));
        }
        let mut seen = HashSet::new();
        for store in &self.stores {
            if !seen.insert(store.name.as_str()) {
                return Err(StoreError::InvalidConfig(format!("store {} is declared twice", store.name)));
            }
            let mut index_names = HashSet::new();
            for index in &store.indexes {
                if !index_names.insert(index.name.as_str()) {
                    return Err(StoreError::InvalidConfig(format!("index {} is declared twice on store {}", index.name, store.name)));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("verbose", &self.verbose)
            .field("stores", &self.stores)
            .field("on_init", &self.on_init.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: StoreParams,
    #[serde(default)]
    pub indexes: Vec<IndexDescriptor>,
}

impl StoreDescriptor {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), params: StoreParams::default(), indexes: Vec::new() } }

    pub fn key_path(mut self, key_path: impl Into<KeyPath>) -> Self {
        self.params.key_path = Some(key_path.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.params.auto_increment = true;
        self
    }

    pub fn index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<KeyPath>,
    #[serde(default)]
    pub auto_increment: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    pub name: String,
    pub key_path: KeyPath,
    #[serde(default)]
    pub params: IndexParams,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>, key_path: impl Into<KeyPath>) -> Self {
        Self { name: name.into(), key_path: key_path.into(), params: IndexParams::default() }
    }

    pub fn unique(mut self) -> Self {
        self.params.unique = true;
        self
    }

    pub fn multi_entry(mut self) -> Self {
        self.params.multi_entry = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexParams {
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub multi_entry: bool,
}
