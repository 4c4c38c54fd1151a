#![allow(unused)]

use tracing::Level;

use idbkit::{IndexDescriptor, Key, MemoryBackend, Store, StoreConfig, StoreDescriptor};
use idbkit_storage_memory::{Op, RequestRecord};

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init(); }

pub fn db_name(prefix: &str) -> String { format!("{}_{}", prefix, ulid::Ulid::new()) }

/// `albums` has a key generator and two indexes; `settings` takes explicit keys
pub fn library_config(name: &str) -> StoreConfig {
    StoreConfig::new(name)
        .version(1)
        .verbose(true)
        .store(
            StoreDescriptor::new("albums")
                .auto_increment()
                .index(IndexDescriptor::new("by_year", "year"))
                .index(IndexDescriptor::new("by_name", "name").unique()),
        )
        .store(StoreDescriptor::new("settings"))
}

pub async fn open_library() -> Result<(MemoryBackend, Store<MemoryBackend>), anyhow::Error> {
    let backend = MemoryBackend::new();
    let store = Store::new(backend.clone(), library_config(&db_name("library")))?;
    store.open().await?;
    backend.clear_log();
    Ok((backend, store))
}

/// Keys of the requests of one kind, in the order the engine saw them
pub fn request_keys(requests: &[RequestRecord], op: Op) -> Vec<Key> {
    requests.iter().filter(|r| r.op == op).filter_map(|r| r.key.clone()).collect()
}
