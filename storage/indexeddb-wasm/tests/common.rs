#![allow(unused)]

use idbkit_core::{IndexDescriptor, Store, StoreConfig, StoreDescriptor};
use idbkit_storage_indexeddb_wasm::IndexedDbBackend;
use tracing_subscriber::layer::SubscriberExt;
use tracing_wasm::{ConsoleConfig, WASMLayerConfigBuilder};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

pub fn setup() {
    console_error_panic_hook::set_once();

    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::registry::Registry::default().with(tracing_wasm::WASMLayer::new(
            WASMLayerConfigBuilder::new()
                .set_report_logs_in_timings(true)
                .set_console_config(ConsoleConfig::ReportWithoutConsoleColor)
                .set_max_level(tracing::Level::INFO)
                .build(),
        )),
    );
}

pub fn db_name(prefix: &str) -> String { format!("{}_{}", prefix, ulid::Ulid::new()) }

/// `albums` uses a key generator with two indexes; `settings` uses explicit keys
pub fn config(name: &str) -> StoreConfig {
    StoreConfig::new(name)
        .version(1)
        .store(
            StoreDescriptor::new("albums")
                .auto_increment()
                .index(IndexDescriptor::new("by_year", "year"))
                .index(IndexDescriptor::new("by_name", "name").unique()),
        )
        .store(StoreDescriptor::new("settings"))
}

pub async fn open_store(prefix: &str) -> Result<Store<IndexedDbBackend>, anyhow::Error> {
    setup();
    let store = Store::new(IndexedDbBackend::new(), config(&db_name(prefix)))?;
    store.open().await?;
    Ok(store)
}
