//! JSON-safe conversion of arbitrary payloads.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Convert any serializable value into a [`Value`] without failing.
///
/// Values the serializer rejects (maps with non-string keys, failing custom
/// `Serialize` impls) become a string placeholder instead of an error.
#[must_use]
pub fn to_json_safe<T: Serialize + ?Sized>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(v) => v,
        Err(err) => {
            debug!(error = %err, "value_not_serializable");
            Value::String(format!("<unserializable: {err}>"))
        }
    }
}
