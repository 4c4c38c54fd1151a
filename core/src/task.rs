//! Scheduling on the host event loop.
//!
//! Callback-form completions never run inside the engine's own dispatch: the finished result is
//! handed to [`defer`], which queues the callback as a fresh task.

use std::future::Future;

#[cfg(not(target_arch = "wasm32"))]
/// Spawn a task on the current thread's local task set.
///
/// Must be called from within a `tokio::task::LocalSet`.
pub fn spawn_local<F>(future: F)
where F: Future<Output = ()> + 'static {
    tokio::task::spawn_local(future);
}

#[cfg(target_arch = "wasm32")]
pub fn spawn_local<F>(future: F)
where F: Future<Output = ()> + 'static {
    wasm_bindgen_futures::spawn_local(future);
}

/// Run `f` as its own task on the next turn of the event loop
pub fn defer<F>(f: F)
where F: FnOnce() + 'static {
    spawn_local(async move { f() });
}
