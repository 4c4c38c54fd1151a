use anyhow::anyhow;
use wasm_bindgen::JsValue;

/// Helper trait a bit like expect, except it's tailored for wasm-bindgen use cases
/// This helps eliminate a lot of boilerplate code associated with error type conversions
pub trait WBGRequire<T> {
    fn require(self, err: &'static str) -> anyhow::Result<T>;
}
impl<T> WBGRequire<T> for Result<T, JsValue> {
    fn require(self, err: &'static str) -> anyhow::Result<T> {
        self.map_err(|e| anyhow!("{} - {}", err, crate::error::extract_message(e)))
    }
}
impl<T> WBGRequire<T> for Option<T> {
    fn require(self, err: &'static str) -> anyhow::Result<T> { self.ok_or_else(|| anyhow!("{} is None", err)) }
}
impl<T> WBGRequire<T> for Result<Option<T>, JsValue> {
    fn require(self, err: &'static str) -> anyhow::Result<T> {
        match self {
            Ok(Some(res)) => Ok(res),
            Ok(None) => Err(anyhow!("{} is None", err)),
            Err(e) => Err(anyhow!("{} - {}", err, crate::error::extract_message(e))),
        }
    }
}
