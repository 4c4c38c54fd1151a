use idbkit_core::{IndexDescriptor, KeyPath, SchemaBuilder, StoreError, StoreParams};
use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{IdbDatabase, IdbIndexParameters, IdbObjectStoreParameters, IdbTransaction};

use crate::error::from_js;
use crate::value::{key_path_to_js, string_list};

/// Schema access during `upgradeneeded`, backed by the version-change transaction
pub(crate) struct IdbSchemaBuilder {
    db: IdbDatabase,
    tx: IdbTransaction,
    old_version: u32,
    new_version: u32,
}

impl IdbSchemaBuilder {
    pub fn new(db: IdbDatabase, tx: IdbTransaction, old_version: u32, new_version: u32) -> Self { Self { db, tx, old_version, new_version } }
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), StoreError> {
    Reflect::set(target, &JsValue::from_str(key), value).map_err(from_js)?;
    Ok(())
}

impl SchemaBuilder for IdbSchemaBuilder {
    fn old_version(&self) -> u32 { self.old_version }

    fn new_version(&self) -> u32 { self.new_version }

    fn store_names(&self) -> Vec<String> { string_list(&self.db.object_store_names()) }

    fn index_names(&self, store: &str) -> Result<Vec<String>, StoreError> {
        let store = self.tx.object_store(store).map_err(from_js)?;
        Ok(string_list(&store.index_names()))
    }

    fn create_object_store(&mut self, name: &str, params: &StoreParams) -> Result<(), StoreError> {
        let options = Object::new();
        if let Some(key_path) = &params.key_path {
            set(&options, "keyPath", &key_path_to_js(key_path))?;
        }
        set(&options, "autoIncrement", &JsValue::from_bool(params.auto_increment))?;
        let options: IdbObjectStoreParameters = options.unchecked_into();
        self.db.create_object_store_with_optional_parameters(name, &options).map_err(from_js)?;
        Ok(())
    }

    fn create_index(&mut self, store: &str, index: &IndexDescriptor) -> Result<(), StoreError> {
        let object_store = self.tx.object_store(store).map_err(from_js)?;
        let options = Object::new();
        set(&options, "unique", &JsValue::from_bool(index.params.unique))?;
        set(&options, "multiEntry", &JsValue::from_bool(index.params.multi_entry))?;
        let options: IdbIndexParameters = options.unchecked_into();
        match &index.key_path {
            KeyPath::Single(path) => object_store.create_index_with_str_and_optional_parameters(&index.name, path, &options),
            compound => object_store.create_index_with_str_sequence_and_optional_parameters(&index.name, &key_path_to_js(compound), &options),
        }
        .map_err(from_js)?;
        Ok(())
    }
}
