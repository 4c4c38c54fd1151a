use futures::StreamExt;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::ops::Range;
use std::rc::Rc;
use tracing::{info, warn};

use crate::action_debug;
use crate::backend::{Backend, Connection, CursorDirection, Item, SchemaBuilder, Transaction, TransactionMode, UpgradeHook};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::key::{Key, MAX_SAFE_INTEGER};
use crate::schema;

/// Where a [`Store`] is in its connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unopened,
    Opening,
    Ready,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Debug::fmt(self, f) }
}

enum State<C> {
    Unopened,
    Opening,
    Ready(Rc<C>),
    Failed(StoreError),
}

impl<C> State<C> {
    fn kind(&self) -> LifecycleState {
        match self {
            State::Unopened => LifecycleState::Unopened,
            State::Opening => LifecycleState::Opening,
            State::Ready(_) => LifecycleState::Ready,
            State::Failed(_) => LifecycleState::Failed,
        }
    }
}

/// Handle to one named, versioned database.
///
/// Cloning is cheap and every clone shares the same connection. Each operation opens its own
/// transaction scoped to a single object store and settles independently of the others.
pub struct Store<B: Backend>(Rc<Inner<B>>);

struct Inner<B: Backend> {
    backend: B,
    config: Rc<StoreConfig>,
    state: RefCell<State<B::Connection>>,
}

impl<B: Backend> Clone for Store<B> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<B: Backend> fmt::Display for Store<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Store({})", self.0.config.name) }
}

impl<B: Backend> fmt::Debug for Store<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("config", &self.0.config).field("state", &self.state()).finish()
    }
}

impl<B: Backend> Store<B> {
    /// Create an unopened handle. Nothing touches the engine until [`Store::open`].
    pub fn new(backend: B, config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self(Rc::new(Inner { backend, config: Rc::new(config), state: RefCell::new(State::Unopened) })))
    }

    pub fn config(&self) -> &StoreConfig { &self.0.config }

    pub fn backend(&self) -> &B { &self.0.backend }

    pub fn state(&self) -> LifecycleState { self.0.state.borrow().kind() }

    /// The error that moved the handle into [`LifecycleState::Failed`], if any
    pub fn last_error(&self) -> Option<StoreError> {
        match &*self.0.state.borrow() {
            State::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// Connect to the configured database, running the schema upgrade if the version moved.
    ///
    /// A no-op when already Ready. Retrying after a failure is allowed, and so is retrying after
    /// an open future was dropped before it finished.
    pub async fn open(&self) -> Result<(), StoreError> {
        {
            let mut state = self.0.state.borrow_mut();
            match &*state {
                State::Ready(_) => return Ok(()),
                State::Opening => return Err(StoreError::NotReady(LifecycleState::Opening)),
                State::Unopened | State::Failed(_) => *state = State::Opening,
            }
        }
        let _opening = OpeningGuard(&self.0.state);

        let config = self.0.config.clone();
        action_debug!(self, "open", "version {}", config.version);
        let hook: UpgradeHook = {
            let config = config.clone();
            Box::new(move |builder: &mut dyn SchemaBuilder| schema::apply(&config, builder))
        };

        match self.0.backend.open(&config.name, config.version, hook).await {
            Ok(connection) => {
                *self.0.state.borrow_mut() = State::Ready(Rc::new(connection));
                if config.verbose {
                    info!("Database opened. ({}, {})", config.name, config.version);
                }
                if let Some(on_init) = &config.on_init {
                    on_init();
                }
                Ok(())
            }
            Err(e) => {
                if config.verbose {
                    warn!("Couldn't open the database. ({})", e.code());
                }
                *self.0.state.borrow_mut() = State::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Close the connection. The handle can be opened again afterwards.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.0.state.borrow_mut(), State::Unopened);
        if let State::Ready(connection) = previous {
            action_debug!(self, "close");
            connection.close();
        }
    }

    /// Close the connection and remove the whole database from the engine
    pub async fn delete_database(&self) -> Result<(), StoreError> {
        self.close();
        self.0.backend.delete_database(&self.0.config.name).await
    }

    pub fn store_names(&self) -> Result<Vec<String>, StoreError> { Ok(self.connection()?.store_names()) }

    pub fn index_names(&self, store: &str) -> Result<Vec<String>, StoreError> { self.connection()?.index_names(store) }

    /// Store `value`, failing with `ConstraintError` if the key is taken.
    ///
    /// Without an explicit `key` the store's key path or key generator decides; the key actually
    /// used is returned.
    pub async fn add(&self, store: &str, value: Item, key: Option<Key>) -> Result<Key, StoreError> {
        action_debug!(self, "add", "{}", store);
        let result = self.single(store, TransactionMode::ReadWrite, |tx| async move { tx.add(store, &value, key.as_ref()).await }).await;
        self.settle(result, "Value stored.", "Couldn't store the value.")
    }

    /// Store `value`, overwriting whatever lives under the key
    pub async fn put(&self, store: &str, value: Item, key: Option<Key>) -> Result<Key, StoreError> {
        action_debug!(self, "put", "{}", store);
        let result = self.single(store, TransactionMode::ReadWrite, |tx| async move { tx.put(store, &value, key.as_ref()).await }).await;
        self.settle(result, "Value updated.", "Couldn't update the value.")
    }

    pub async fn get(&self, store: &str, key: &Key) -> Result<Option<Item>, StoreError> {
        action_debug!(self, "get", "{} {}", store, key);
        let result = self.single(store, TransactionMode::ReadOnly, |tx| async move { tx.get(store, key).await }).await;
        if self.0.config.verbose {
            if let Ok(value) = &result {
                info!("{}", value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "undefined".to_owned()));
            }
        }
        self.settle(result, "Value retrieved.", "Couldn't get the value.")
    }

    pub async fn del(&self, store: &str, key: &Key) -> Result<(), StoreError> {
        action_debug!(self, "del", "{} {}", store, key);
        let result = self.single(store, TransactionMode::ReadWrite, |tx| async move { tx.delete(store, key).await }).await;
        self.settle(result, "Value deleted.", "Couldn't delete the value.")
    }

    /// Remove every item from `store`. The key generator is left untouched.
    pub async fn clear_store(&self, store: &str) -> Result<(), StoreError> {
        action_debug!(self, "clear_store", "{}", store);
        let result = self.single(store, TransactionMode::ReadWrite, |tx| async move { tx.clear(store).await }).await;
        self.settle(result, "Store clear.", "Couldn't clear the store.")
    }

    pub async fn count(&self, store: &str) -> Result<u64, StoreError> {
        let result = self.single(store, TransactionMode::ReadOnly, |tx| async move { tx.count(store).await }).await;
        self.settle(result, "Store counted.", "Couldn't count the store.")
    }

    /// Every value in the store, in key order.
    ///
    /// Resolves only after the read transaction has completed.
    pub async fn get_all(&self, store: &str) -> Result<Vec<Item>, StoreError> { self.get_all_in(store, CursorDirection::Next).await }

    pub async fn get_all_in(&self, store: &str, direction: CursorDirection) -> Result<Vec<Item>, StoreError> {
        action_debug!(self, "get_all", "{} {:?}", store, direction);
        let result = self
            .single(store, TransactionMode::ReadOnly, |tx| async move {
                let entries = collect_cursor(&*tx, store, direction).await?;
                Ok(entries.into_iter().map(|(_, value)| value).collect::<Vec<_>>())
            })
            .await;
        self.settle(result, "Values retrieved.", "Couldn't get the values.")
    }

    /// Every key in the store, in key order
    pub async fn get_all_keys(&self, store: &str) -> Result<Vec<Key>, StoreError> {
        let result = self
            .single(store, TransactionMode::ReadOnly, |tx| async move {
                let entries = collect_cursor(&*tx, store, CursorDirection::Next).await?;
                Ok(entries.into_iter().map(|(key, _)| key).collect::<Vec<_>>())
            })
            .await;
        self.settle(result, "Keys retrieved.", "Couldn't get the keys.")
    }

    /// First value whose `index` key equals `key`
    pub async fn get_by_index(&self, store: &str, index: &str, key: &Key) -> Result<Option<Item>, StoreError> {
        Ok(self.get_all_by_index(store, index, key).await?.into_iter().next())
    }

    pub async fn get_all_by_index(&self, store: &str, index: &str, key: &Key) -> Result<Vec<Item>, StoreError> {
        action_debug!(self, "get_all_by_index", "{}.{} {}", store, index, key);
        let result = self.single(store, TransactionMode::ReadOnly, |tx| async move { tx.index_get_all(store, index, key).await }).await;
        self.settle(result, "Values retrieved.", "Couldn't get the values.")
    }

    /// Write `values[i]` under key `start_key + i`, one committed write at a time.
    ///
    /// Stops at the first failure; writes that already committed stay.
    pub async fn put_all(&self, store: &str, values: Vec<Item>, start_key: i64) -> Result<(), StoreError> {
        action_debug!(self, "put_all", "{} ({} values from {})", store, values.len(), start_key);
        let result = async {
            let connection = self.connection()?;
            let keys = consecutive_keys(start_key, values.len())?;
            for (key, value) in keys.map(Key::from).zip(values.iter()) {
                let tx = connection.transaction(&[store], TransactionMode::ReadWrite)?;
                tx.put(store, value, Some(&key)).await?;
                tx.done().await?;
            }
            Ok(())
        }
        .await;
        self.settle(result, "Values stored.", "Couldn't store the values.")
    }

    /// Re-key every item to 1..=N, keeping key order.
    ///
    /// Read, clear and rewrite all happen inside one read-write transaction, so a failure at any
    /// step leaves the store as it was.
    pub async fn reset_auto_index(&self, store: &str) -> Result<(), StoreError> {
        action_debug!(self, "reset_auto_index", "{}", store);
        let result = self
            .single(store, TransactionMode::ReadWrite, |tx| async move {
                let entries = collect_cursor(&*tx, store, CursorDirection::Next).await?;
                tx.clear(store).await?;
                for (offset, (_, value)) in entries.iter().enumerate() {
                    tx.put(store, value, Some(&Key::from(1 + offset as i64))).await?;
                }
                Ok(())
            })
            .await;
        self.settle(result, "Index reset.", "Couldn't reset the index.")
    }

    fn connection(&self) -> Result<Rc<B::Connection>, StoreError> {
        match &*self.0.state.borrow() {
            State::Ready(connection) => Ok(connection.clone()),
            other => Err(StoreError::NotReady(other.kind())),
        }
    }

    /// Run `work` inside one transaction on `store`, then wait for that transaction to settle.
    /// A failing step aborts the transaction.
    async fn single<T, F, Fut>(&self, store: &str, mode: TransactionMode, work: F) -> Result<T, StoreError>
    where
        F: FnOnce(Rc<<B::Connection as Connection>::Transaction>) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let connection = self.connection()?;
        let tx = Rc::new(connection.transaction(&[store], mode)?);
        match work(tx.clone()).await {
            Ok(value) => {
                tx.done().await?;
                Ok(value)
            }
            Err(e) => {
                // the engine may already have aborted it
                let _ = tx.abort();
                Err(e)
            }
        }
    }

    fn settle<T>(&self, result: Result<T, StoreError>, done: &str, failed: &str) -> Result<T, StoreError> {
        if self.0.config.verbose {
            match &result {
                Ok(_) => info!("{}", done),
                Err(e) => warn!("{} ({})", failed, e.code()),
            }
        }
        result
    }
}

/// Puts the handle back to Unopened if an open is dropped before it settles
struct OpeningGuard<'a, C>(&'a RefCell<State<C>>);

impl<C> Drop for OpeningGuard<'_, C> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.try_borrow_mut() {
            if matches!(*state, State::Opening) {
                *state = State::Unopened;
            }
        }
    }
}

/// `start..start + len`, as long as every key in it is an exact numeric key
fn consecutive_keys(start: i64, len: usize) -> Result<Range<i64>, StoreError> {
    if len == 0 {
        return Ok(start..start);
    }
    let last = i64::try_from(len - 1).ok().and_then(|n| start.checked_add(n));
    match last {
        Some(last) if start >= -MAX_SAFE_INTEGER && last <= MAX_SAFE_INTEGER => Ok(start..last + 1),
        _ => Err(StoreError::Data(format!("{} consecutive keys from {} do not all fit in the exact integer range", len, start))),
    }
}

async fn collect_cursor<T: Transaction>(tx: &T, store: &str, direction: CursorDirection) -> Result<Vec<(Key, Item)>, StoreError> {
    let mut cursor = tx.open_cursor(store, direction)?;
    let mut entries = Vec::new();
    while let Some(entry) = cursor.next().await {
        entries.push(entry?);
    }
    Ok(entries)
}
