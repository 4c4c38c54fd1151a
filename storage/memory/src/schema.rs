use idbkit_core::{IndexDescriptor, SchemaBuilder, StoreError, StoreParams};

use crate::engine::{DatabaseData, StoreData};

pub(crate) struct MemorySchemaBuilder<'a> {
    data: &'a mut DatabaseData,
    old_version: u32,
    new_version: u32,
}

impl<'a> MemorySchemaBuilder<'a> {
    pub fn new(data: &'a mut DatabaseData, old_version: u32, new_version: u32) -> Self { Self { data, old_version, new_version } }
}

impl SchemaBuilder for MemorySchemaBuilder<'_> {
    fn old_version(&self) -> u32 { self.old_version }

    fn new_version(&self) -> u32 { self.new_version }

    fn store_names(&self) -> Vec<String> { self.data.stores.keys().cloned().collect() }

    fn index_names(&self, store: &str) -> Result<Vec<String>, StoreError> {
        let data = self.data.stores.get(store).ok_or_else(|| StoreError::NotFound(format!("no object store named {}", store)))?;
        Ok(data.indexes.keys().cloned().collect())
    }

    fn create_object_store(&mut self, name: &str, params: &StoreParams) -> Result<(), StoreError> {
        if self.data.stores.contains_key(name) {
            return Err(StoreError::Constraint(format!("object store {} already exists", name)));
        }
        if let (Some(key_path), true) = (&params.key_path, params.auto_increment) {
            if key_path.is_empty() || key_path.is_compound() {
                return Err(StoreError::InvalidAccess(format!("key generator cannot be used with key path {}", key_path)));
            }
        }
        self.data.stores.insert(name.to_owned(), StoreData::new(params.clone()));
        Ok(())
    }

    fn create_index(&mut self, store: &str, index: &IndexDescriptor) -> Result<(), StoreError> {
        let data = self.data.stores.get_mut(store).ok_or_else(|| StoreError::NotFound(format!("no object store named {}", store)))?;
        if data.indexes.contains_key(&index.name) {
            return Err(StoreError::Constraint(format!("index {} already exists on {}", index.name, store)));
        }
        if index.params.multi_entry && index.key_path.is_compound() {
            return Err(StoreError::InvalidAccess(format!("multi-entry index {} cannot use a compound key path", index.name)));
        }
        data.indexes.insert(index.name.clone(), index.clone());
        Ok(())
    }
}
