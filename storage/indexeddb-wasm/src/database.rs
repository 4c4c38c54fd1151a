use async_trait::async_trait;
use idbkit_core::{backend::UpgradeHook, notice_info, Backend, Connection, StoreError, TransactionMode};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{window, IdbDatabase, IdbFactory, IdbOpenDbRequest, IdbTransactionMode, IdbVersionChangeEvent};

use crate::error::from_js;
use crate::schema::IdbSchemaBuilder;
use crate::transaction::IndexedDbTransaction;
use crate::util::{cb_future::CBFuture, cb_race::CBRace, require::WBGRequire};
use crate::value::string_list;

/// The browser's IndexedDB factory
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedDbBackend;

impl IndexedDbBackend {
    pub fn new() -> Self { Self }

    fn factory() -> Result<IdbFactory, StoreError> {
        let window = window().require("get window")?;
        let idb: IdbFactory = window.indexed_db().require("get indexeddb")?;
        Ok(idb)
    }
}

#[async_trait(?Send)]
impl Backend for IndexedDbBackend {
    type Connection = IdbConnection;

    async fn open(&self, name: &str, version: u32, on_upgrade: UpgradeHook) -> Result<IdbConnection, StoreError> {
        notice_info!("IndexedDbBackend.open({}, {})", name, version);
        let open_request = Self::factory()?.open_with_u32(name, version).map_err(from_js)?;

        let hook = RefCell::new(Some(on_upgrade));
        let race = CBRace::new();
        let closure = race.wrap(move |event: IdbVersionChangeEvent| -> Result<(), StoreError> {
            let open_request: IdbOpenDbRequest = event.target().require("get event target")?.unchecked_into();
            let transaction = open_request.transaction().require("get upgrade transaction")?;
            let db: IdbDatabase = open_request.result().require("get database during upgrade")?.unchecked_into();
            let new_version = event.new_version().unwrap_or_default() as u32;
            let mut builder = IdbSchemaBuilder::new(db, transaction, event.old_version() as u32, new_version);
            if let Some(hook) = hook.borrow_mut().take() {
                hook(&mut builder);
            }
            Ok(())
        });
        open_request.set_onupgradeneeded(Some(closure.as_ref().unchecked_ref()));

        let opened = CBFuture::new(&open_request, "success", "error")?.await;
        open_request.set_onupgradeneeded(None);
        opened?;
        race.take_err()??;

        let db = open_request.result().map_err(from_js)?.unchecked_into::<IdbDatabase>();
        Ok(IdbConnection::new(name, db))
    }

    async fn delete_database(&self, name: &str) -> Result<(), StoreError> {
        notice_info!("IndexedDbBackend.delete_database({})", name);
        let request = Self::factory()?.delete_database(name).map_err(from_js)?;
        CBFuture::new(&request, &["success", "blocked"], "error")?.await
    }
}

#[derive(Debug)]
pub struct IdbConnection {
    name: String,
    db: IdbDatabase,
    /// Keep onversionchange handler alive for the lifetime of the connection
    _onversionchange: Closure<dyn FnMut(IdbVersionChangeEvent)>,
    /// Set when another connection upgrades or deletes the database and this one had to close
    stale: Rc<Cell<bool>>,
}

impl IdbConnection {
    fn new(name: &str, db: IdbDatabase) -> Self {
        let stale = Rc::new(Cell::new(false));
        let stale_for_cb = stale.clone();
        let onversionchange = Closure::wrap(Box::new(move |event: IdbVersionChangeEvent| {
            stale_for_cb.set(true);
            if let Some(target) = event.target() {
                warn!("Version change event received - closing database");
                let db: IdbDatabase = target.unchecked_into();
                db.close();
            }
        }) as Box<dyn FnMut(IdbVersionChangeEvent)>);
        db.set_onversionchange(Some(onversionchange.as_ref().unchecked_ref()));
        Self { name: name.to_owned(), db, _onversionchange: onversionchange, stale }
    }

    pub fn is_stale(&self) -> bool { self.stale.get() }
}

impl Connection for IdbConnection {
    type Transaction = IndexedDbTransaction;

    fn name(&self) -> String { self.name.clone() }

    fn version(&self) -> u32 { self.db.version() as u32 }

    fn store_names(&self) -> Vec<String> { string_list(&self.db.object_store_names()) }

    fn index_names(&self, store: &str) -> Result<Vec<String>, StoreError> {
        let tx = self.transaction(&[store], TransactionMode::ReadOnly)?;
        tx.index_names(store)
    }

    fn transaction(&self, stores: &[&str], mode: TransactionMode) -> Result<IndexedDbTransaction, StoreError> {
        if self.is_stale() {
            return Err(StoreError::InvalidState("the connection was closed by a version change".into()));
        }
        debug!("IdbConnection.transaction({:?}, {})", stores, mode);
        let scope: js_sys::Array = stores.iter().map(|s| wasm_bindgen::JsValue::from_str(s)).collect();
        let idb_mode = match mode {
            TransactionMode::ReadOnly => IdbTransactionMode::Readonly,
            TransactionMode::ReadWrite => IdbTransactionMode::Readwrite,
        };
        let tx = self.db.transaction_with_str_sequence_and_mode(&scope, idb_mode).map_err(from_js)?;
        IndexedDbTransaction::new(tx, mode)
    }

    fn close(&self) {
        self.db.set_onversionchange(None);
        self.db.close();
    }
}

impl Drop for IdbConnection {
    fn drop(&mut self) { self.db.set_onversionchange(None); }
}
