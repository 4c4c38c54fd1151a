//! In-process backend for idbkit.
//!
//! Reproduces the parts of IndexedDB that the store handle relies on: versioned open with an
//! upgrade hook, in-line and out-of-line keys, key generators, unique and multi-entry indexes,
//! transaction scope and mode checks, and rollback when a request fails.
//!
//! Every transaction and request is logged, and failures can be injected with [`Fault`], which
//! makes it the backend of choice for tests.

mod engine;
mod fault;
mod schema;
mod transaction;

pub use engine::{MemoryBackend, MemoryConnection, RequestRecord, TransactionRecord};
pub use fault::{Fault, Op};
pub use transaction::MemoryTransaction;
