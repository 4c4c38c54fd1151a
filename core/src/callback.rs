//! Callback-registration form of the [`Store`] operations.
//!
//! Each `*_with` method returns immediately. The operation runs as a local task and its outcome
//! is delivered to exactly one of `on_success` / `on_error` through [`task::defer`], never from
//! inside the engine's own event dispatch.
//!
//! On native targets these must be called from within a `tokio::task::LocalSet`.

use std::future::Future;

use crate::action_warn;
use crate::backend::{Backend, Item};
use crate::error::StoreError;
use crate::key::Key;
use crate::store::Store;
use crate::task;

impl<B: Backend + 'static> Store<B> {
    /// Open in the background; the configured `on_init` callback fires on success.
    /// Failures only reach the log (and [`Store::last_error`]).
    pub fn open_in_background(&self) {
        let this = self.clone();
        task::spawn_local(async move {
            if let Err(e) = this.open().await {
                action_warn!(this, "open_in_background", "{}", e);
            }
        });
    }

    pub fn add_with<S, E>(&self, store: &str, value: Item, key: Option<Key>, on_success: S, on_error: E)
    where
        S: FnOnce(Key) + 'static,
        E: FnOnce(StoreError) + 'static,
    {
        let (this, store) = (self.clone(), store.to_owned());
        dispatch(async move { this.add(&store, value, key).await }, on_success, on_error);
    }

    pub fn put_with<S, E>(&self, store: &str, value: Item, key: Option<Key>, on_success: S, on_error: E)
    where
        S: FnOnce(Key) + 'static,
        E: FnOnce(StoreError) + 'static,
    {
        let (this, store) = (self.clone(), store.to_owned());
        dispatch(async move { this.put(&store, value, key).await }, on_success, on_error);
    }

    pub fn get_with<S, E>(&self, store: &str, key: Key, on_success: S, on_error: E)
    where
        S: FnOnce(Option<Item>) + 'static,
        E: FnOnce(StoreError) + 'static,
    {
        let (this, store) = (self.clone(), store.to_owned());
        dispatch(async move { this.get(&store, &key).await }, on_success, on_error);
    }

    pub fn del_with<S, E>(&self, store: &str, key: Key, on_success: S, on_error: E)
    where
        S: FnOnce(()) + 'static,
        E: FnOnce(StoreError) + 'static,
    {
        let (this, store) = (self.clone(), store.to_owned());
        dispatch(async move { this.del(&store, &key).await }, on_success, on_error);
    }

    pub fn clear_store_with<S, E>(&self, store: &str, on_success: S, on_error: E)
    where
        S: FnOnce(()) + 'static,
        E: FnOnce(StoreError) + 'static,
    {
        let (this, store) = (self.clone(), store.to_owned());
        dispatch(async move { this.clear_store(&store).await }, on_success, on_error);
    }

    pub fn get_all_with<S, E>(&self, store: &str, on_success: S, on_error: E)
    where
        S: FnOnce(Vec<Item>) + 'static,
        E: FnOnce(StoreError) + 'static,
    {
        let (this, store) = (self.clone(), store.to_owned());
        dispatch(async move { this.get_all(&store).await }, on_success, on_error);
    }

    pub fn put_all_with<S, E>(&self, store: &str, values: Vec<Item>, start_key: i64, on_success: S, on_error: E)
    where
        S: FnOnce(()) + 'static,
        E: FnOnce(StoreError) + 'static,
    {
        let (this, store) = (self.clone(), store.to_owned());
        dispatch(async move { this.put_all(&store, values, start_key).await }, on_success, on_error);
    }

    pub fn reset_auto_index_with<S, E>(&self, store: &str, on_success: S, on_error: E)
    where
        S: FnOnce(()) + 'static,
        E: FnOnce(StoreError) + 'static,
    {
        let (this, store) = (self.clone(), store.to_owned());
        dispatch(async move { this.reset_auto_index(&store).await }, on_success, on_error);
    }
}

fn dispatch<T, Op, S, E>(op: Op, on_success: S, on_error: E)
where
    T: 'static,
    Op: Future<Output = Result<T, StoreError>> + 'static,
    S: FnOnce(T) + 'static,
    E: FnOnce(StoreError) + 'static,
{
    task::spawn_local(async move {
        let result = op.await;
        task::defer(move || match result {
            Ok(value) => on_success(value),
            Err(e) => on_error(e),
        });
    });
}
