use async_trait::async_trait;
use futures::StreamExt;
use idbkit_core::{backend::CursorStream, CursorDirection, Item, Key, StoreError, Transaction, TransactionMode};
use std::cell::{Cell, RefCell};
use wasm_bindgen::JsValue;
use web_sys::{IdbObjectStore, IdbRequest};

use crate::cursor::StoreScanner;
use crate::error::from_js;
use crate::util::cb_future::CBFuture;
use crate::value::{item_from_js, item_to_js, key_from_js, key_to_js, string_list};

/// One IndexedDB transaction.
///
/// The completion listeners are attached at creation so that a transaction which settles before
/// anyone awaits [`Transaction::done`] is still observed.
pub struct IndexedDbTransaction {
    tx: web_sys::IdbTransaction,
    mode: TransactionMode,
    completion: RefCell<Option<CBFuture>>,
    aborted: Cell<bool>,
}

impl IndexedDbTransaction {
    pub(crate) fn new(tx: web_sys::IdbTransaction, mode: TransactionMode) -> Result<Self, StoreError> {
        let completion = CBFuture::new(&tx, "complete", &["error", "abort"])?;
        Ok(Self { tx, mode, completion: RefCell::new(Some(completion)), aborted: Cell::new(false) })
    }

    fn store(&self, name: &str) -> Result<IdbObjectStore, StoreError> { self.tx.object_store(name).map_err(from_js) }

    pub(crate) fn index_names(&self, store: &str) -> Result<Vec<String>, StoreError> { Ok(string_list(&self.store(store)?.index_names())) }

    async fn request(&self, request: IdbRequest) -> Result<JsValue, StoreError> {
        CBFuture::new(&request, "success", "error")?.await?;
        request.result().map_err(from_js)
    }

    async fn write(&self, store: &str, value: &Item, key: Option<&Key>, overwrite: bool) -> Result<Key, StoreError> {
        if let Some(key) = key {
            key.validate()?;
        }
        let object_store = self.store(store)?;
        let value = item_to_js(value)?;
        let request = match (key.map(key_to_js), overwrite) {
            (Some(key), false) => object_store.add_with_key(&value, &key),
            (None, false) => object_store.add(&value),
            (Some(key), true) => object_store.put_with_key(&value, &key),
            (None, true) => object_store.put(&value),
        }
        .map_err(from_js)?;
        key_from_js(&self.request(request).await?)
    }
}

#[async_trait(?Send)]
impl Transaction for IndexedDbTransaction {
    fn mode(&self) -> TransactionMode { self.mode }

    async fn add(&self, store: &str, value: &Item, key: Option<&Key>) -> Result<Key, StoreError> { self.write(store, value, key, false).await }

    async fn put(&self, store: &str, value: &Item, key: Option<&Key>) -> Result<Key, StoreError> { self.write(store, value, key, true).await }

    async fn get(&self, store: &str, key: &Key) -> Result<Option<Item>, StoreError> {
        key.validate()?;
        let request = self.store(store)?.get(&key_to_js(key)).map_err(from_js)?;
        let value = self.request(request).await?;
        if value.is_undefined() {
            return Ok(None);
        }
        item_from_js(value).map(Some)
    }

    async fn delete(&self, store: &str, key: &Key) -> Result<(), StoreError> {
        key.validate()?;
        let request = self.store(store)?.delete(&key_to_js(key)).map_err(from_js)?;
        self.request(request).await?;
        Ok(())
    }

    async fn clear(&self, store: &str) -> Result<(), StoreError> {
        let request = self.store(store)?.clear().map_err(from_js)?;
        self.request(request).await?;
        Ok(())
    }

    async fn count(&self, store: &str) -> Result<u64, StoreError> {
        let request = self.store(store)?.count().map_err(from_js)?;
        let count = self.request(request).await?;
        count.as_f64().map(|n| n as u64).ok_or_else(|| StoreError::Data("count did not return a number".into()))
    }

    async fn index_get_all(&self, store: &str, index: &str, key: &Key) -> Result<Vec<Item>, StoreError> {
        key.validate()?;
        let index = self.store(store)?.index(index).map_err(from_js)?;
        let request = index.get_all_with_key(&key_to_js(key)).map_err(from_js)?;
        let values = js_sys::Array::from(&self.request(request).await?);
        values.iter().map(item_from_js).collect()
    }

    fn open_cursor(&self, store: &str, direction: CursorDirection) -> Result<CursorStream<'_>, StoreError> {
        Ok(StoreScanner::new(self.store(store)?, direction).scan().boxed_local())
    }

    fn abort(&self) -> Result<(), StoreError> {
        self.tx.abort().map_err(from_js)?;
        self.aborted.set(true);
        Ok(())
    }

    async fn done(&self) -> Result<(), StoreError> {
        if self.aborted.get() {
            return Err(StoreError::Abort("the transaction was aborted".into()));
        }
        let completion = self.completion.borrow_mut().take();
        match completion {
            Some(completion) => completion.await,
            None => Err(StoreError::InvalidState("the transaction has already been awaited".into())),
        }
    }
}
