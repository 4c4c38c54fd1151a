mod common;
use common::*;

use idbkit::{json, CursorDirection, Key, StoreError, TransactionMode};
use idbkit_storage_memory::{Fault, Op, TransactionRecord};

#[tokio::test]
async fn each_operation_uses_one_single_store_transaction() -> Result<(), anyhow::Error> {
    let (backend, store) = open_library().await?;
    let database = store.config().name.clone();
    let record = |store: &str, mode| TransactionRecord { database: database.clone(), stores: vec![store.to_owned()], mode };

    store.add("albums", json!({ "name": "Showbiz", "year": "1999" }), None).await?;
    store.put("settings", json!("dark"), Some(Key::from("theme"))).await?;
    store.get("settings", &Key::from("theme")).await?;
    store.get_all("albums").await?;
    store.del("settings", &Key::from("theme")).await?;
    store.clear_store("albums").await?;

    assert_eq!(
        backend.transactions(),
        vec![
            record("albums", TransactionMode::ReadWrite),
            record("settings", TransactionMode::ReadWrite),
            record("settings", TransactionMode::ReadOnly),
            record("albums", TransactionMode::ReadOnly),
            record("settings", TransactionMode::ReadWrite),
            record("albums", TransactionMode::ReadWrite),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn add_refuses_existing_keys_and_put_overwrites() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;

    assert_eq!(store.add("settings", json!("dark"), Some(Key::from("theme"))).await?, Key::from("theme"));
    let duplicate = store.add("settings", json!("light"), Some(Key::from("theme"))).await;
    assert!(matches!(duplicate, Err(StoreError::Constraint(_))));
    assert_eq!(store.get("settings", &Key::from("theme")).await?, Some(json!("dark")));

    store.put("settings", json!("light"), Some(Key::from("theme"))).await?;
    assert_eq!(store.get("settings", &Key::from("theme")).await?, Some(json!("light")));
    assert_eq!(store.count("settings").await?, 1);
    Ok(())
}

#[tokio::test]
async fn get_missing_key_is_none_and_delete_is_idempotent() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    assert_eq!(store.get("settings", &Key::from("nope")).await?, None);
    store.del("settings", &Key::from("nope")).await?;
    store.del("settings", &Key::from("nope")).await?;
    Ok(())
}

#[tokio::test]
async fn key_generator_supplies_keys() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    let first = store.add("albums", json!({ "name": "Showbiz", "year": "1999" }), None).await?;
    let second = store.add("albums", json!({ "name": "Absolution", "year": "2003" }), None).await?;
    assert_eq!((first, second), (Key::from(1), Key::from(2)));

    // clearing keeps the generator where it was
    store.clear_store("albums").await?;
    let third = store.add("albums", json!({ "name": "Drones", "year": "2015" }), None).await?;
    assert_eq!(third, Key::from(3));
    Ok(())
}

#[tokio::test]
async fn missing_store_and_bad_keys_are_reported() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    assert_eq!(store.get("missing", &Key::from(1)).await.map_err(|e| e.code().to_owned()), Err("NotFoundError".to_owned()));
    assert!(matches!(store.put("settings", json!(1), None).await, Err(StoreError::Data(_))));
    assert!(matches!(store.get("settings", &Key::from(f64::NAN)).await, Err(StoreError::Data(_))));
    Ok(())
}

#[tokio::test]
async fn get_all_returns_values_in_key_order() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    assert!(store.get_all("settings").await?.is_empty());

    store.put("settings", json!("b"), Some(Key::from("beta"))).await?;
    store.put("settings", json!("n"), Some(Key::from(10))).await?;
    store.put("settings", json!("a"), Some(Key::from("alpha"))).await?;
    store.put("settings", json!("m"), Some(Key::from(2))).await?;

    // numbers sort before strings
    assert_eq!(store.get_all("settings").await?, vec![json!("m"), json!("n"), json!("a"), json!("b")]);
    assert_eq!(store.get_all_in("settings", CursorDirection::Prev).await?, vec![json!("b"), json!("a"), json!("n"), json!("m")]);
    assert_eq!(store.get_all_keys("settings").await?, vec![Key::from(2), Key::from(10), Key::from("alpha"), Key::from("beta")]);
    Ok(())
}

#[tokio::test]
async fn get_all_fails_when_the_cursor_fails() -> Result<(), anyhow::Error> {
    let (backend, store) = open_library().await?;
    store.put("settings", json!("a"), Some(Key::from(1))).await?;
    backend.inject(Fault::new(Op::Cursor, StoreError::Engine { code: "UnknownError".into(), message: "cursor lost".into() }));
    assert_eq!(store.get_all("settings").await.map_err(|e| e.code().to_owned()), Err("UnknownError".to_owned()));
    assert_eq!(store.get_all("settings").await?, vec![json!("a")]);
    Ok(())
}

#[tokio::test]
async fn put_all_writes_consecutive_keys() -> Result<(), anyhow::Error> {
    let (backend, store) = open_library().await?;
    store.put_all("settings", vec![json!("a"), json!("b"), json!("c")], 7).await?;

    assert_eq!(store.get("settings", &Key::from(7)).await?, Some(json!("a")));
    assert_eq!(store.get("settings", &Key::from(8)).await?, Some(json!("b")));
    assert_eq!(store.get("settings", &Key::from(9)).await?, Some(json!("c")));
    assert_eq!(store.count("settings").await?, 3);

    // one committed transaction per write, issued in order
    assert_eq!(request_keys(&backend.requests(), Op::Put), vec![Key::from(7), Key::from(8), Key::from(9)]);
    let writes = backend.transactions().iter().filter(|t| t.mode == TransactionMode::ReadWrite).count();
    assert_eq!(writes, 3);
    Ok(())
}

#[tokio::test]
async fn put_all_of_nothing_succeeds() -> Result<(), anyhow::Error> {
    let (backend, store) = open_library().await?;
    store.put_all("settings", Vec::new(), 1).await?;
    assert!(backend.transactions().is_empty());
    Ok(())
}

#[tokio::test]
async fn put_all_refuses_keys_past_the_exact_integer_range() -> Result<(), anyhow::Error> {
    let (backend, store) = open_library().await?;

    // 2^53 and 2^53 + 1 would collapse onto the same numeric key
    let result = store.put_all("settings", vec![json!("a"), json!("b")], 1 << 53).await;
    assert!(matches!(result, Err(StoreError::Data(_))));
    assert!(matches!(store.put_all("settings", vec![json!("a"), json!("b")], i64::MAX).await, Err(StoreError::Data(_))));
    assert!(matches!(store.put_all("settings", vec![json!("a")], i64::MIN).await, Err(StoreError::Data(_))));

    // refused before any write was issued
    assert!(backend.requests().is_empty());
    assert_eq!(store.count("settings").await?, 0);

    store.put_all("settings", vec![json!("a"), json!("b")], idbkit::MAX_SAFE_INTEGER - 1).await?;
    assert_eq!(store.count("settings").await?, 2);
    Ok(())
}

#[tokio::test]
async fn put_all_stops_at_the_first_failure() -> Result<(), anyhow::Error> {
    let (backend, store) = open_library().await?;
    backend.inject(Fault::new(Op::Put, StoreError::Engine { code: "QuotaExceededError".into(), message: "full".into() }).on_key(3));

    let result = store.put_all("settings", vec![json!("a"), json!("b"), json!("c"), json!("d")], 1).await;
    assert_eq!(result.map_err(|e| e.code().to_owned()), Err("QuotaExceededError".to_owned()));

    // the fourth write was never issued; the first two stay committed
    assert_eq!(request_keys(&backend.requests(), Op::Put), vec![Key::from(1), Key::from(2), Key::from(3)]);
    assert_eq!(store.get_all_keys("settings").await?, vec![Key::from(1), Key::from(2)]);
    Ok(())
}

#[tokio::test]
async fn reset_auto_index_renumbers_in_key_order() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    store.put("settings", json!("five"), Some(Key::from(5))).await?;
    store.put("settings", json!("nine"), Some(Key::from(9))).await?;
    store.put("settings", json!("two"), Some(Key::from(2))).await?;

    store.reset_auto_index("settings").await?;
    assert_eq!(store.get_all_keys("settings").await?, vec![Key::from(1), Key::from(2), Key::from(3)]);
    assert_eq!(store.get_all("settings").await?, vec![json!("two"), json!("five"), json!("nine")]);
    Ok(())
}

#[tokio::test]
async fn reset_auto_index_of_empty_store_is_a_no_op() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    store.reset_auto_index("settings").await?;
    assert!(store.get_all("settings").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn reset_auto_index_rolls_back_on_failure() -> Result<(), anyhow::Error> {
    let (backend, store) = open_library().await?;
    store.put("settings", json!("five"), Some(Key::from(5))).await?;
    store.put("settings", json!("nine"), Some(Key::from(9))).await?;
    store.put("settings", json!("two"), Some(Key::from(2))).await?;

    backend.inject(Fault::new(Op::Put, StoreError::Abort("interrupted".into())).on_store("settings").on_key(2));
    assert!(matches!(store.reset_auto_index("settings").await, Err(StoreError::Abort(_))));

    // clear and the first rewrite were undone with the rest of the transaction
    assert_eq!(store.get_all_keys("settings").await?, vec![Key::from(2), Key::from(5), Key::from(9)]);
    assert_eq!(store.get_all("settings").await?, vec![json!("two"), json!("five"), json!("nine")]);
    Ok(())
}

#[tokio::test]
async fn reset_auto_index_on_in_line_keys_changes_nothing() -> Result<(), anyhow::Error> {
    let backend = idbkit::MemoryBackend::new();
    let config = idbkit::StoreConfig::new(db_name("inline")).store(idbkit::StoreDescriptor::new("notes").key_path("id"));
    let store = idbkit::Store::new(backend, config)?;
    store.open().await?;
    store.put("notes", json!({ "id": 10, "text": "x" }), None).await?;

    assert!(matches!(store.reset_auto_index("notes").await, Err(StoreError::Data(_))));
    assert_eq!(store.get_all_keys("notes").await?, vec![Key::from(10)]);
    Ok(())
}

#[tokio::test]
async fn indexes_are_queryable() -> Result<(), anyhow::Error> {
    let (_backend, store) = open_library().await?;
    store.add("albums", json!({ "name": "Origin of Symmetry", "year": "2001" }), None).await?;
    store.add("albums", json!({ "name": "Hullabaloo", "year": "2001" }), None).await?;
    store.add("albums", json!({ "name": "Absolution", "year": "2003" }), None).await?;

    let from_2001 = store.get_all_by_index("albums", "by_year", &Key::from("2001")).await?;
    assert_eq!(from_2001.len(), 2);
    assert_eq!(from_2001[0], json!({ "name": "Origin of Symmetry", "year": "2001" }));

    let by_name = store.get_by_index("albums", "by_name", &Key::from("Absolution")).await?;
    assert_eq!(by_name, Some(json!({ "name": "Absolution", "year": "2003" })));
    assert_eq!(store.get_by_index("albums", "by_name", &Key::from("Drones")).await?, None);

    let clash = store.add("albums", json!({ "name": "Absolution", "year": "2004" }), None).await;
    assert!(matches!(clash, Err(StoreError::Constraint(_))));
    assert!(matches!(store.get_all_by_index("albums", "by_label", &Key::from("x")).await, Err(StoreError::NotFound(_))));
    Ok(())
}
