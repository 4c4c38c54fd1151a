use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

use idbkit_core::{backend::CursorStream, CursorDirection, IndexDescriptor, Item, Key, StoreError, Transaction, TransactionMode};

use crate::engine::{DatabaseData, Engine, StoreData};
use crate::fault::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    Committed,
    Aborted,
}

/// How a request was refused. Thrown errors leave the transaction alone; request errors abort it.
enum Refusal {
    Thrown(StoreError),
    Failed(StoreError),
}

/// Writes apply to the live store immediately; the first write to each store keeps a copy of
/// that store so an abort can put it back.
#[derive(Debug)]
pub struct MemoryTransaction {
    engine: Rc<Engine>,
    db: Rc<RefCell<DatabaseData>>,
    scope: Vec<String>,
    mode: TransactionMode,
    undo: RefCell<HashMap<String, StoreData>>,
    phase: Cell<Phase>,
}

impl MemoryTransaction {
    pub(crate) fn new(engine: Rc<Engine>, db: Rc<RefCell<DatabaseData>>, scope: Vec<String>, mode: TransactionMode) -> Self {
        Self { engine, db, scope, mode, undo: RefCell::new(HashMap::new()), phase: Cell::new(Phase::Active) }
    }

    /// Checks the engine performs before a request is queued
    fn check(&self, op: Op, store: &str, key: Option<&Key>, writes: bool) -> Result<(), StoreError> {
        self.engine.record_request(op, store, key);
        if self.phase.get() != Phase::Active {
            return Err(StoreError::TransactionInactive("the transaction has finished".into()));
        }
        if !self.scope.iter().any(|s| s == store) {
            return Err(StoreError::NotFound(format!("object store {} is not in the transaction's scope", store)));
        }
        if writes && self.mode == TransactionMode::ReadOnly {
            return Err(StoreError::ReadOnly("the transaction is read-only".into()));
        }
        if let Some(key) = key {
            key.validate()?;
        }
        Ok(())
    }

    /// `check`, then give injected faults a chance to fail the request
    fn begin(&self, op: Op, store: &str, key: Option<&Key>, writes: bool) -> Result<(), StoreError> {
        self.check(op, store, key, writes)?;
        match self.engine.trip(op, store, key) {
            Some(error) => Err(self.fail(error)),
            None => Ok(()),
        }
    }

    fn fail(&self, error: StoreError) -> StoreError {
        debug!("request failed, aborting transaction: {}", error);
        self.rollback();
        error
    }

    fn rollback(&self) {
        self.phase.set(Phase::Aborted);
        let saved: Vec<(String, StoreData)> = self.undo.borrow_mut().drain().collect();
        let mut db = self.db.borrow_mut();
        for (name, data) in saved {
            db.stores.insert(name, data);
        }
    }

    fn checkpoint(&self, store: &str, data: &StoreData) { self.undo.borrow_mut().entry(store.to_owned()).or_insert_with(|| data.clone()); }

    fn settle<T>(&self, outcome: Result<T, Refusal>) -> Result<T, StoreError> {
        match outcome {
            Ok(value) => Ok(value),
            Err(Refusal::Thrown(error)) => Err(error),
            Err(Refusal::Failed(error)) => Err(self.fail(error)),
        }
    }

    fn write(&self, store: &str, value: &Item, key: Option<&Key>, overwrite: bool) -> Result<Key, StoreError> {
        self.begin(if overwrite { Op::Put } else { Op::Add }, store, key, true)?;

        let outcome = {
            let mut db = self.db.borrow_mut();
            match db.stores.get_mut(store) {
                None => Err(Refusal::Thrown(StoreError::NotFound(format!("no object store named {}", store)))),
                Some(data) => {
                    self.checkpoint(store, data);
                    insert(data, store, value, key, overwrite)
                }
            }
        };
        self.settle(outcome)
    }

    fn read<T>(&self, store: &str, f: impl FnOnce(&StoreData) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let db = self.db.borrow();
        let data = db.stores.get(store).ok_or_else(|| StoreError::NotFound(format!("no object store named {}", store)))?;
        f(data)
    }
}

fn insert(data: &mut StoreData, store: &str, value: &Item, key: Option<&Key>, overwrite: bool) -> Result<Key, Refusal> {
    let mut value = value.clone();
    let key = match (&data.params.key_path, key) {
        (Some(_), Some(_)) => {
            return Err(Refusal::Thrown(StoreError::Data(format!("{} uses in-line keys; an explicit key cannot be given", store))));
        }
        (Some(key_path), None) => match key_path.evaluate(&value) {
            Some(key) => key,
            None if data.params.auto_increment && !key_path.resolves(&value) => {
                let key = Key::Number(data.next_key);
                key_path.inject(&mut value, &key).map_err(Refusal::Thrown)?;
                key
            }
            None => return Err(Refusal::Thrown(StoreError::Data(format!("value has no valid key at key path {}", key_path)))),
        },
        (None, Some(key)) => key.clone(),
        (None, None) if data.params.auto_increment => Key::Number(data.next_key),
        (None, None) => {
            return Err(Refusal::Thrown(StoreError::Data(format!("{} uses out-of-line keys and has no key generator; a key is required", store))))
        }
    };
    key.validate().map_err(Refusal::Thrown)?;

    if !overwrite && data.records.contains_key(&key) {
        return Err(Refusal::Failed(StoreError::Constraint(format!("key {} already exists in {}", key, store))));
    }
    for index in data.indexes.values().filter(|i| i.params.unique) {
        let wanted = index_keys(index, &value);
        let clash = data.records.iter().filter(|(k, _)| **k != key).any(|(_, other)| index_keys(index, other).iter().any(|k| wanted.contains(k)));
        if clash {
            return Err(Refusal::Failed(StoreError::Constraint(format!("unique index {} already holds this value", index.name))));
        }
    }

    if data.params.auto_increment {
        if let Key::Number(n) = key {
            if n >= data.next_key {
                data.next_key = n.floor() + 1.0;
            }
        }
    }
    data.records.insert(key.clone(), value);
    Ok(key)
}

/// The keys `value` contributes to `index`
fn index_keys(index: &IndexDescriptor, value: &Item) -> Vec<Key> {
    match index.key_path.evaluate(value) {
        None => Vec::new(),
        Some(Key::Array(items)) if index.params.multi_entry => {
            let mut keys: Vec<Key> = items.into_iter().filter(|k| k.validate().is_ok()).collect();
            keys.sort();
            keys.dedup();
            keys
        }
        Some(key) => vec![key],
    }
}

#[async_trait(?Send)]
impl Transaction for MemoryTransaction {
    fn mode(&self) -> TransactionMode { self.mode }

    async fn add(&self, store: &str, value: &Item, key: Option<&Key>) -> Result<Key, StoreError> { self.write(store, value, key, false) }

    async fn put(&self, store: &str, value: &Item, key: Option<&Key>) -> Result<Key, StoreError> { self.write(store, value, key, true) }

    async fn get(&self, store: &str, key: &Key) -> Result<Option<Item>, StoreError> {
        self.begin(Op::Get, store, Some(key), false)?;
        self.read(store, |data| Ok(data.records.get(key).cloned()))
    }

    async fn delete(&self, store: &str, key: &Key) -> Result<(), StoreError> {
        self.begin(Op::Delete, store, Some(key), true)?;
        let mut db = self.db.borrow_mut();
        let data = db.stores.get_mut(store).ok_or_else(|| StoreError::NotFound(format!("no object store named {}", store)))?;
        self.checkpoint(store, data);
        data.records.remove(key);
        Ok(())
    }

    async fn clear(&self, store: &str) -> Result<(), StoreError> {
        self.begin(Op::Clear, store, None, true)?;
        let mut db = self.db.borrow_mut();
        let data = db.stores.get_mut(store).ok_or_else(|| StoreError::NotFound(format!("no object store named {}", store)))?;
        self.checkpoint(store, data);
        data.records.clear();
        Ok(())
    }

    async fn count(&self, store: &str) -> Result<u64, StoreError> {
        self.begin(Op::Count, store, None, false)?;
        self.read(store, |data| Ok(data.records.len() as u64))
    }

    async fn index_get_all(&self, store: &str, index: &str, key: &Key) -> Result<Vec<Item>, StoreError> {
        self.begin(Op::IndexGet, store, Some(key), false)?;
        self.read(store, |data| {
            let descriptor = data.indexes.get(index).ok_or_else(|| StoreError::NotFound(format!("no index named {} on {}", index, store)))?;
            Ok(data.records.values().filter(|value| index_keys(descriptor, value).contains(key)).cloned().collect())
        })
    }

    fn open_cursor(&self, store: &str, direction: CursorDirection) -> Result<CursorStream<'_>, StoreError> {
        self.check(Op::Cursor, store, None, false)?;
        if let Some(error) = self.engine.trip(Op::Cursor, store, None) {
            let error = self.fail(error);
            return Ok(stream::once(async move { Err(error) }).boxed_local());
        }
        let mut entries: Vec<(Key, Item)> = self.read(store, |data| Ok(data.records.iter().map(|(k, v)| (k.clone(), v.clone())).collect()))?;
        if direction == CursorDirection::Prev {
            entries.reverse();
        }
        Ok(stream::iter(entries.into_iter().map(Ok)).boxed_local())
    }

    fn abort(&self) -> Result<(), StoreError> {
        if self.phase.get() != Phase::Active {
            return Err(StoreError::InvalidState("the transaction has already finished".into()));
        }
        self.rollback();
        Ok(())
    }

    async fn done(&self) -> Result<(), StoreError> {
        match self.phase.get() {
            Phase::Aborted => Err(StoreError::Abort("the transaction was aborted".into())),
            _ => {
                self.phase.set(Phase::Committed);
                self.undo.borrow_mut().clear();
                Ok(())
            }
        }
    }
}
