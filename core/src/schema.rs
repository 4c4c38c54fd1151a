use tracing::{debug, warn};

use crate::backend::SchemaBuilder;
use crate::config::{StoreConfig, StoreDescriptor};
use crate::error::StoreError;

/// Apply the configured stores and indexes inside an upgrade.
///
/// The first failure stops the remaining schema work; it is logged and swallowed so the open
/// itself still completes.
pub(crate) fn apply(config: &StoreConfig, schema: &mut dyn SchemaBuilder) {
    debug!("upgrading {} from version {} to {}", config.name, schema.old_version(), schema.new_version());
    if let Err(e) = create_stores(&config.stores, schema) {
        if config.verbose {
            warn!("Error creating store objects. ({})", e);
        } else {
            debug!("schema upgrade of {} stopped: {}", config.name, e);
        }
    }
}

fn create_stores(stores: &[StoreDescriptor], schema: &mut dyn SchemaBuilder) -> Result<(), StoreError> {
    for store in stores {
        // stores and indexes from earlier versions are already in place
        if !schema.store_names().contains(&store.name) {
            schema.create_object_store(&store.name, &store.params)?;
        }
        let existing = schema.index_names(&store.name)?;
        for index in &store.indexes {
            if !existing.contains(&index.name) {
                schema.create_index(&store.name, index)?;
            }
        }
    }
    Ok(())
}
