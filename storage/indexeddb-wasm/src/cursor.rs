use futures::{Stream, StreamExt};
use idbkit_core::{CursorDirection, Item, Key, StoreError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{IdbCursorDirection, IdbCursorWithValue, IdbObjectStore};

use crate::error::from_js;
use crate::util::cb_stream::CBStream;
use crate::value::{item_from_js, key_from_js};

/// Walks an object store with a value cursor, one `continue()` per entry.
pub(crate) struct StoreScanner {
    store: IdbObjectStore,
    direction: IdbCursorDirection,
}

impl StoreScanner {
    pub fn new(store: IdbObjectStore, direction: CursorDirection) -> Self {
        let direction = match direction {
            CursorDirection::Next => IdbCursorDirection::Next,
            CursorDirection::Prev => IdbCursorDirection::Prev,
        };
        Self { store, direction }
    }

    /// Entries in cursor order. The stream ends after the first error.
    pub fn scan(self) -> impl Stream<Item = Result<(Key, Item), StoreError>> {
        futures::stream::unfold(Some(ScanState::Initial(self)), |state| async move {
            match state? {
                ScanState::Initial(scanner) => {
                    let request = match scanner.store.open_cursor_with_range_and_direction(&JsValue::NULL, scanner.direction) {
                        Ok(request) => request,
                        Err(e) => return Some((Err(from_js(e)), None)),
                    };
                    let stream = match CBStream::new(&request) {
                        Ok(stream) => stream,
                        Err(e) => return Some((Err(e), None)),
                    };
                    next_entry(Box::pin(stream)).await
                }
                ScanState::Scanning(stream) => next_entry(stream).await,
            }
        })
    }
}

enum ScanState {
    Initial(StoreScanner),
    Scanning(std::pin::Pin<Box<CBStream>>),
}

async fn next_entry(mut stream: std::pin::Pin<Box<CBStream>>) -> Option<(Result<(Key, Item), StoreError>, Option<ScanState>)> {
    let cursor_result = match stream.next().await? {
        Ok(val) => val,
        Err(e) => return Some((Err(e), None)),
    };

    // end of cursor
    if cursor_result.is_null() || cursor_result.is_undefined() {
        return None;
    }

    let cursor: IdbCursorWithValue = match cursor_result.dyn_into() {
        Ok(c) => c,
        Err(e) => return Some((Err(from_js(e)), None)),
    };

    let entry = cursor
        .primary_key()
        .map_err(from_js)
        .and_then(|key| key_from_js(&key))
        .and_then(|key| Ok((key, item_from_js(cursor.value().map_err(from_js)?)?)));
    let entry = match entry {
        Ok(entry) => entry,
        Err(e) => return Some((Err(e), None)),
    };

    if let Err(e) = cursor.continue_() {
        return Some((Err(from_js(e)), None));
    }

    Some((Ok(entry), Some(ScanState::Scanning(stream))))
}
