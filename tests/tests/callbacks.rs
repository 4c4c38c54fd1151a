mod common;
use common::*;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use idbkit::{json, Item, Key, LifecycleState, MemoryBackend, Store, StoreError};
use idbkit_storage_memory::{Fault, Op};
use tokio::sync::oneshot;
use tokio::task::LocalSet;

/// A success/error callback pair that forwards whichever fires into a channel
fn outcome<T: 'static>() -> (impl FnOnce(T) + 'static, impl FnOnce(StoreError) + 'static, oneshot::Receiver<Result<T, StoreError>>) {
    let (sender, receiver) = oneshot::channel();
    let sender = Rc::new(RefCell::new(Some(sender)));
    let on_success = {
        let sender = sender.clone();
        move |value: T| {
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(Ok(value));
            }
        }
    };
    let on_error = move |error: StoreError| {
        if let Some(sender) = sender.borrow_mut().take() {
            let _ = sender.send(Err(error));
        }
    };
    (on_success, on_error, receiver)
}

#[tokio::test]
async fn callbacks_fire_after_the_call_returns() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    LocalSet::new()
        .run_until(async move {
            let fired = Rc::new(Cell::new(false));
            let (sender, receiver) = oneshot::channel();
            store.add_with(
                "settings",
                json!("dark"),
                Some(Key::from("theme")),
                {
                    let fired = fired.clone();
                    move |key| {
                        fired.set(true);
                        let _ = sender.send(key);
                    }
                },
                |e| panic!("add failed: {}", e),
            );
            assert!(!fired.get());
            assert_eq!(receiver.await?, Key::from("theme"));
            assert!(fired.get());

            let (on_success, on_error, receiver) = outcome::<Option<Item>>();
            store.get_with("settings", Key::from("theme"), on_success, on_error);
            assert_eq!(receiver.await?, Ok(Some(json!("dark"))));
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test]
async fn errors_reach_the_error_callback() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    LocalSet::new()
        .run_until(async move {
            store.put("settings", json!("dark"), Some(Key::from("theme"))).await?;

            let (on_success, on_error, receiver) = outcome::<Key>();
            store.add_with("settings", json!("light"), Some(Key::from("theme")), on_success, on_error);
            assert!(matches!(receiver.await?, Err(StoreError::Constraint(_))));

            let (on_success, on_error, receiver) = outcome::<Vec<Item>>();
            store.get_all_with("nope", on_success, on_error);
            assert!(matches!(receiver.await?, Err(StoreError::NotFound(_))));
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test]
async fn bulk_operations_in_callback_form() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    LocalSet::new()
        .run_until(async move {
            let (on_success, on_error, receiver) = outcome::<()>();
            store.put_all_with("settings", vec![json!("a"), json!("b")], 4, on_success, on_error);
            receiver.await??;

            let (on_success, on_error, receiver) = outcome::<()>();
            store.reset_auto_index_with("settings", on_success, on_error);
            receiver.await??;

            let (on_success, on_error, receiver) = outcome::<()>();
            store.del_with("settings", Key::from(1), on_success, on_error);
            receiver.await??;

            let (on_success, on_error, receiver) = outcome::<Vec<Item>>();
            store.get_all_with("settings", on_success, on_error);
            assert_eq!(receiver.await??, vec![json!("b")]);

            let (on_success, on_error, receiver) = outcome::<()>();
            store.clear_store_with("settings", on_success, on_error);
            receiver.await??;
            assert_eq!(store.count("settings").await?, 0);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test]
async fn put_all_failure_reaches_only_the_error_callback() -> Result<(), anyhow::Error> {
    let (backend, store) = open_library().await?;
    backend.inject(Fault::new(Op::Put, StoreError::Engine { code: "QuotaExceededError".into(), message: "full".into() }).on_key(2));
    LocalSet::new()
        .run_until(async move {
            let successes = Rc::new(Cell::new(0));
            let errors = Rc::new(RefCell::new(Vec::new()));
            let (sender, receiver) = oneshot::channel();
            store.put_all_with(
                "settings",
                vec![json!("a"), json!("b"), json!("c")],
                1,
                {
                    let successes = successes.clone();
                    move |()| successes.set(successes.get() + 1)
                },
                {
                    let errors = errors.clone();
                    move |error: StoreError| {
                        errors.borrow_mut().push(error.code().to_owned());
                        let _ = sender.send(());
                    }
                },
            );
            receiver.await?;
            tokio::task::yield_now().await;

            assert_eq!(successes.get(), 0);
            assert_eq!(*errors.borrow(), vec!["QuotaExceededError".to_owned()]);
            assert_eq!(store.get_all_keys("settings").await?, vec![Key::from(1)]);
            Ok::<(), anyhow::Error>(())
        })
        .await
}

#[tokio::test]
async fn open_in_background_fires_on_init() -> Result<(), anyhow::Error> {
    LocalSet::new()
        .run_until(async move {
            let (sender, receiver) = oneshot::channel();
            let sender = RefCell::new(Some(sender));
            let config = library_config(&db_name("background")).on_init(move || {
                if let Some(sender) = sender.borrow_mut().take() {
                    let _ = sender.send(());
                }
            });
            let store = Store::new(MemoryBackend::new(), config)?;

            store.open_in_background();
            receiver.await?;
            assert_eq!(store.state(), LifecycleState::Ready);
            Ok::<(), anyhow::Error>(())
        })
        .await
}
