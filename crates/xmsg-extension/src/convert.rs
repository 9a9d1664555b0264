//! JSON <-> JsValue conversion at the host boundary.
//!
//! The runtime's messaging serializes payloads as JSON, so going through
//! `JSON.stringify` / `JSON.parse` preserves exactly what the peer sees.
//! `undefined` maps to `None` (an absent message or response).

use std::fmt;

use serde_json::Value;
use wasm_bindgen::prelude::*;

/// Convert a JSON value into a JS value
pub fn to_js(value: &Value) -> Result<JsValue, String> {
    let text = serde_json::to_string(value).map_err(|e| e.to_string())?;
    js_sys::JSON::parse(&text).map_err(|e| describe_js_error(&e))
}

/// Convert a reply for the host; absent (or unconvertible) becomes `undefined`
pub fn reply_to_js(value: Option<Value>) -> JsValue {
    value
        .and_then(|value| to_js(&value).ok())
        .unwrap_or(JsValue::UNDEFINED)
}

/// Convert a JS value into JSON; `undefined` is `None`
pub fn from_js(value: &JsValue) -> Result<Option<Value>, String> {
    if value.is_undefined() {
        return Ok(None);
    }
    let text = js_sys::JSON::stringify(value).map_err(|e| describe_js_error(&e))?;
    let text = text
        .as_string()
        .ok_or_else(|| "value is not JSON-serializable".to_string())?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| e.to_string())
}

/// Best-effort readable description of a thrown JS value or `lastError`
pub fn describe_js_error(error: &JsValue) -> String {
    if let Some(message) = error.as_string() {
        return message;
    }
    if error.is_object() {
        if let Ok(message) = js_sys::Reflect::get(error, &JsValue::from_str("message")) {
            if let Some(message) = message.as_string() {
                return message;
            }
        }
    }
    format!("{:?}", error)
}

/// Error value returned to JS callers of exported functions
pub fn js_error(error: impl fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use serde_json::json;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_json_survives_the_boundary() {
        let value = json!({ "cmd": "echo", "payload": [1, "two", null, { "three": true }] });
        let js = to_js(&value).unwrap();
        assert_eq!(from_js(&js).unwrap(), Some(value));
    }

    #[wasm_bindgen_test]
    fn test_undefined_is_absent() {
        assert_eq!(from_js(&JsValue::UNDEFINED).unwrap(), None);
        assert!(reply_to_js(None).is_undefined());
        assert_eq!(from_js(&JsValue::NULL).unwrap(), Some(Value::Null));
    }

    #[wasm_bindgen_test]
    fn test_describe_js_error() {
        let error = js_sys::Error::new("Receiving end does not exist.");
        assert_eq!(describe_js_error(&error.into()), "Receiving end does not exist.");
        assert_eq!(describe_js_error(&JsValue::from_str("plain")), "plain");
    }
}
