use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::debug;

use idbkit_core::{
    backend::UpgradeHook, Backend, Connection, IndexDescriptor, Item, Key, StoreError, StoreParams, TransactionMode,
};

use crate::fault::{Fault, Op};
use crate::schema::MemorySchemaBuilder;
use crate::transaction::MemoryTransaction;

/// One object store: its creation parameters, its indexes and its records in key order
#[derive(Debug, Clone)]
pub(crate) struct StoreData {
    pub params: StoreParams,
    pub indexes: BTreeMap<String, IndexDescriptor>,
    pub records: BTreeMap<Key, Item>,
    /// Next value of the key generator; only meaningful with `auto_increment`
    pub next_key: f64,
}

impl StoreData {
    pub fn new(params: StoreParams) -> Self { Self { params, indexes: BTreeMap::new(), records: BTreeMap::new(), next_key: 1.0 } }
}

#[derive(Debug, Default)]
pub(crate) struct DatabaseData {
    pub version: u32,
    pub stores: BTreeMap<String, StoreData>,
}

/// A transaction as the engine saw it being created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub database: String,
    pub stores: Vec<String>,
    pub mode: TransactionMode,
}

/// A request as the engine saw it being issued, whether or not it succeeded
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub op: Op,
    pub store: String,
    pub key: Option<Key>,
}

#[derive(Debug, Default)]
pub(crate) struct Engine {
    databases: RefCell<HashMap<String, Rc<RefCell<DatabaseData>>>>,
    faults: RefCell<Vec<Fault>>,
    transactions: RefCell<Vec<TransactionRecord>>,
    requests: RefCell<Vec<RequestRecord>>,
}

impl Engine {
    pub fn record_request(&self, op: Op, store: &str, key: Option<&Key>) {
        self.requests.borrow_mut().push(RequestRecord { op, store: store.to_owned(), key: key.cloned() });
    }

    /// The error of the first armed fault matching this request, if any
    pub fn trip(&self, op: Op, store: &str, key: Option<&Key>) -> Option<StoreError> {
        let mut faults = self.faults.borrow_mut();
        let position = faults.iter().position(|f| f.matches(op, store, key))?;
        let error = faults[position].trip();
        if faults[position].is_spent() {
            faults.remove(position);
        }
        debug!("injected fault on {} {}: {}", op, store, error);
        Some(error)
    }
}

/// Cheaply cloneable; clones share the same databases, fault list and logs.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend(Rc<Engine>);

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }

    /// Arm a fault; faults are matched in the order they were injected
    pub fn inject(&self, fault: Fault) { self.0.faults.borrow_mut().push(fault); }

    pub fn transactions(&self) -> Vec<TransactionRecord> { self.0.transactions.borrow().clone() }

    pub fn requests(&self) -> Vec<RequestRecord> { self.0.requests.borrow().clone() }

    pub fn clear_log(&self) {
        self.0.transactions.borrow_mut().clear();
        self.0.requests.borrow_mut().clear();
    }

    pub fn database_version(&self, name: &str) -> Option<u32> { self.0.databases.borrow().get(name).map(|db| db.borrow().version) }

    /// Committed contents of a store, in key order
    pub fn contents(&self, database: &str, store: &str) -> Option<Vec<(Key, Item)>> {
        let databases = self.0.databases.borrow();
        let db = databases.get(database)?.borrow();
        let data = db.stores.get(store)?;
        Some(data.records.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[async_trait(?Send)]
impl Backend for MemoryBackend {
    type Connection = MemoryConnection;

    async fn open(&self, name: &str, version: u32, on_upgrade: UpgradeHook) -> Result<MemoryConnection, StoreError> {
        debug!("MemoryBackend.open({}, {})", name, version);
        if let Some(error) = self.0.trip(Op::Open, name, None) {
            return Err(error);
        }
        if version == 0 {
            return Err(StoreError::Engine { code: "TypeError".into(), message: "version must be a positive integer".into() });
        }

        let db = self.0.databases.borrow_mut().entry(name.to_owned()).or_default().clone();
        let old_version = db.borrow().version;
        if version < old_version {
            return Err(StoreError::Version(format!("requested version ({}) is less than the existing version ({})", version, old_version)));
        }
        if version > old_version {
            debug!("upgrading {} from {} to {}", name, old_version, version);
            let mut data = db.borrow_mut();
            let mut builder = MemorySchemaBuilder::new(&mut data, old_version, version);
            on_upgrade(&mut builder);
            data.version = version;
        }

        Ok(MemoryConnection { name: name.to_owned(), version, engine: self.0.clone(), db, closed: Cell::new(false) })
    }

    async fn delete_database(&self, name: &str) -> Result<(), StoreError> {
        debug!("MemoryBackend.delete_database({})", name);
        self.0.databases.borrow_mut().remove(name);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryConnection {
    name: String,
    version: u32,
    engine: Rc<Engine>,
    db: Rc<RefCell<DatabaseData>>,
    closed: Cell<bool>,
}

impl Connection for MemoryConnection {
    type Transaction = MemoryTransaction;

    fn name(&self) -> String { self.name.clone() }

    fn version(&self) -> u32 { self.version }

    fn store_names(&self) -> Vec<String> { self.db.borrow().stores.keys().cloned().collect() }

    fn index_names(&self, store: &str) -> Result<Vec<String>, StoreError> {
        let db = self.db.borrow();
        let data = db.stores.get(store).ok_or_else(|| StoreError::NotFound(format!("no object store named {}", store)))?;
        Ok(data.indexes.keys().cloned().collect())
    }

    fn transaction(&self, stores: &[&str], mode: TransactionMode) -> Result<MemoryTransaction, StoreError> {
        if self.closed.get() {
            return Err(StoreError::InvalidState("the connection is closed".into()));
        }
        if stores.is_empty() {
            return Err(StoreError::InvalidAccess("a transaction needs at least one object store".into()));
        }
        let mut scope: Vec<String> = Vec::with_capacity(stores.len());
        {
            let db = self.db.borrow();
            for store in stores {
                if !db.stores.contains_key(*store) {
                    return Err(StoreError::NotFound(format!("no object store named {}", store)));
                }
                if !scope.iter().any(|s| s == store) {
                    scope.push((*store).to_owned());
                }
            }
        }
        self.engine.transactions.borrow_mut().push(TransactionRecord { database: self.name.clone(), stores: scope.clone(), mode });
        Ok(MemoryTransaction::new(self.engine.clone(), self.db.clone(), scope, mode))
    }

    fn close(&self) { self.closed.set(true); }
}
