//! Conversions between idbkit keys and values and their JavaScript representation.
//!
//! Values cross the boundary as plain JSON-compatible objects (maps become objects, not `Map`s)
//! so that key paths and indexes can see their properties.

use idbkit_core::{Item, Key, KeyPath, StoreError};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};

pub(crate) fn key_to_js(key: &Key) -> JsValue {
    match key {
        Key::Number(n) => JsValue::from_f64(*n),
        Key::String(s) => JsValue::from_str(s),
        Key::Array(items) => items.iter().map(key_to_js).collect::<js_sys::Array>().into(),
    }
}

/// Only number, string and array keys are supported
pub(crate) fn key_from_js(value: &JsValue) -> Result<Key, StoreError> {
    if let Some(n) = value.as_f64() {
        return Ok(Key::Number(n));
    }
    if let Some(s) = value.as_string() {
        return Ok(Key::String(s));
    }
    if let Some(array) = value.dyn_ref::<js_sys::Array>() {
        return array.iter().map(|item| key_from_js(&item)).collect::<Result<Vec<_>, _>>().map(Key::Array);
    }
    Err(StoreError::Data(format!("unsupported key type: {}", crate::error::extract_message(value.clone()))))
}

pub(crate) fn item_to_js(item: &Item) -> Result<JsValue, StoreError> {
    item.serialize(&serde_wasm_bindgen::Serializer::json_compatible()).map_err(|e| StoreError::Data(e.to_string()))
}

pub(crate) fn item_from_js(value: JsValue) -> Result<Item, StoreError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| StoreError::Data(e.to_string()))
}

pub(crate) fn key_path_to_js(key_path: &KeyPath) -> JsValue {
    match key_path {
        KeyPath::Single(path) => JsValue::from_str(path),
        KeyPath::Compound(paths) => paths.iter().map(|p| JsValue::from_str(p)).collect::<js_sys::Array>().into(),
    }
}

pub(crate) fn string_list(list: &web_sys::DomStringList) -> Vec<String> { (0..list.length()).filter_map(|i| list.item(i)).collect() }
