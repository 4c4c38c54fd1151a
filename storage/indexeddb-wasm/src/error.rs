use idbkit_core::StoreError;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomException, Event, IdbRequest, IdbTransaction};

pub(crate) fn extract_message(err: JsValue) -> String {
    // If it's a JS Error object, grab its `message`
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return format!("{}: {}", e.name(), e.message());
    }
    if let Some(e) = err.dyn_ref::<DomException>() {
        return format!("{}: {}", e.name(), e.message());
    }

    // If it's already a string, convert directly
    if let Some(s) = err.as_string() {
        return s;
    }

    // Fallback: stringify the value
    js_sys::JSON::stringify(&err).ok().and_then(|s| s.as_string()).unwrap_or_else(|| format!("{:?}", err))
}

/// Keep the DOMException name so callers see the engine's own error code
pub(crate) fn from_dom_exception(e: &DomException) -> StoreError { StoreError::from_code(&e.name(), e.message()) }

/// A value thrown synchronously by an IndexedDB method
pub(crate) fn from_js(err: JsValue) -> StoreError {
    if let Some(e) = err.dyn_ref::<DomException>() {
        return from_dom_exception(e);
    }
    // e.g. TypeError for a zero version
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return StoreError::Engine { code: String::from(e.name()), message: String::from(e.message()) };
    }
    StoreError::Engine { code: "UnknownError".into(), message: extract_message(err) }
}

/// The error carried by a failed request or transaction event
pub(crate) fn from_event(event: &Event) -> StoreError {
    let dom_exception = event.target().and_then(|target| {
        if let Some(request) = target.dyn_ref::<IdbRequest>() {
            request.error().ok().flatten()
        } else if let Some(tx) = target.dyn_ref::<IdbTransaction>() {
            tx.error()
        } else {
            None
        }
    });
    match dom_exception {
        Some(e) => from_dom_exception(&e),
        None if event.type_() == "abort" => StoreError::Abort("the transaction was aborted".into()),
        None => StoreError::Engine { code: "UnknownError".into(), message: format!("{} event without an error", event.type_()) },
    }
}
