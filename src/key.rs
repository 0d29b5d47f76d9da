//! Structured cache keys and the cache's key-serialization format.
//!
//! A [`StructuredKey`] is the `{ id, group?, data }` shape layered on top of
//! whatever key the cache itself understands. `data` decides cache identity,
//! `id` and `group` exist so batch operations can find related entries.
//!
//! The cache stores keys as [`RawKey`] and indexes them by their serialized
//! form. Serialization follows the stable-hash layout SWR caches use:
//!
//! ```text
//! string         -> itself (top level) / JSON-quoted (nested)
//! object         -> "#" + key ":" hash "," ...   (keys in reverse-sorted order)
//! array          -> "@" + hash "," ...
//! number, bool   -> literal text
//! ```
//!
//! so `{ id: "todos", data: "/api/todos" }` serializes to
//! `#id:"todos",data:"/api/todos",`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// The `{ id, group?, data }` cache-key shape.
///
/// Immutable once built: a changed key is a new instance.
///
/// # Example
///
/// ```
/// use mutation_kit::StructuredKey;
/// use serde_json::json;
///
/// let key = StructuredKey::new("todos", json!("/api/todos")).with_group("lists");
/// assert_eq!(key.id(), "todos");
/// assert_eq!(key.group(), Some("lists"));
/// assert!(key.is_usable());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredKey {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    #[serde(default)]
    data: Value,
}

impl StructuredKey {
    /// Build a key without a group.
    pub fn new(id: impl Into<String>, data: impl Into<Value>) -> Self {
        StructuredKey {
            id: id.into(),
            group: None,
            data: data.into(),
        }
    }

    /// Return a copy of this key tagged with `group`.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub(crate) fn from_parts(id: String, group: Option<String>, data: Value) -> Self {
        StructuredKey { id, group, data }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// The literal value handed to the cache. `Value::Null` means absent.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Both `id` and `data` are truthy.
    ///
    /// Keys failing this test are treated as absent by the stabilizer and
    /// every mutation.
    pub fn is_usable(&self) -> bool {
        !self.id.is_empty() && is_truthy(&self.data)
    }

    /// Read a structured key out of a JSON object carrying a string `id`.
    ///
    /// Returns `None` for anything else, including objects whose `id` is not
    /// a string.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if !object.get("id").is_some_and(Value::is_string) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// JavaScript-style truthiness of a JSON value.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A key as the cache stores it.
#[derive(Clone, Debug, PartialEq)]
pub enum RawKey {
    /// A structured key object.
    Structured(Arc<StructuredKey>),
    /// An already-serialized key string.
    Text(String),
    /// Any other key value (arrays, plain objects, numbers).
    Value(Value),
}

impl RawKey {
    /// Serialized form the cache indexes entries by.
    pub fn serialize(&self) -> String {
        match self {
            RawKey::Structured(key) => encode(key),
            RawKey::Text(text) => text.clone(),
            RawKey::Value(Value::String(text)) => text.clone(),
            RawKey::Value(value) => stable_hash(value),
        }
    }

    /// Keys whose serialized form starts with `$` belong to the cache itself.
    pub fn is_internal(&self) -> bool {
        self.serialize().starts_with('$')
    }
}

impl From<StructuredKey> for RawKey {
    fn from(key: StructuredKey) -> Self {
        RawKey::Structured(Arc::new(key))
    }
}

impl From<Arc<StructuredKey>> for RawKey {
    fn from(key: Arc<StructuredKey>) -> Self {
        RawKey::Structured(key)
    }
}

impl From<&str> for RawKey {
    fn from(text: &str) -> Self {
        RawKey::Text(text.to_string())
    }
}

impl From<String> for RawKey {
    fn from(text: String) -> Self {
        RawKey::Text(text)
    }
}

/// Serialize a structured key the way the cache does.
///
/// Absent `group` and `data` are skipped.
pub fn encode(key: &StructuredKey) -> String {
    let mut out = String::from("#");
    push_field(&mut out, "id", &quote(&key.id));
    if let Some(group) = &key.group {
        push_field(&mut out, "group", &quote(group));
    }
    if !key.data.is_null() {
        push_field(&mut out, "data", &stable_hash(&key.data));
    }
    out
}

/// Stable hash of an arbitrary JSON value.
///
/// Object keys are visited in reverse-sorted order. Output is canonical: two
/// structurally equal values always hash to the same string.
pub fn stable_hash(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let mut out = String::from("@");
            for item in items {
                out.push_str(&stable_hash(item));
                out.push(',');
            }
            out
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = String::from("#");
            for key in keys.into_iter().rev() {
                push_field(&mut out, key, &stable_hash(&map[key]));
            }
            out
        }
    }
}

fn push_field(out: &mut String, name: &str, hashed: &str) {
    out.push_str(name);
    out.push(':');
    out.push_str(hashed);
    out.push(',');
}

fn quote(text: &str) -> String {
    // Serializing a str never fails
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_id_and_data() {
        let key = StructuredKey::new("todos", json!("/api/todos"));
        assert_eq!(encode(&key), "#id:\"todos\",data:\"/api/todos\",");
    }

    #[test]
    fn test_encode_with_group() {
        let key = StructuredKey::new("user-1", json!("/api/users/1")).with_group("users");
        assert_eq!(
            encode(&key),
            "#id:\"user-1\",group:\"users\",data:\"/api/users/1\","
        );
    }

    #[test]
    fn test_encode_escapes_quotes() {
        let key = StructuredKey::new("q", json!("/search?q=\"rust\""));
        assert_eq!(encode(&key), "#id:\"q\",data:\"/search?q=\\\"rust\\\"\",");
    }

    #[test]
    fn test_stable_hash_orders_object_keys() {
        let a = json!({ "b": 1, "a": [true, null] });
        let b = json!({ "a": [true, null], "b": 1 });
        assert_eq!(stable_hash(&a), stable_hash(&b));
        assert_eq!(stable_hash(&a), "#b:1,a:@true,null,,");
    }

    #[test]
    fn test_is_usable() {
        assert!(StructuredKey::new("a", json!("x")).is_usable());
        assert!(StructuredKey::new("a", json!({ "u": 1 })).is_usable());
        assert!(!StructuredKey::new("", json!("x")).is_usable());
        assert!(!StructuredKey::new("a", Value::Null).is_usable());
        assert!(!StructuredKey::new("a", json!("")).is_usable());
        assert!(!StructuredKey::new("a", json!(0)).is_usable());
        assert!(!StructuredKey::new("a", json!(false)).is_usable());
    }

    #[test]
    fn test_from_value_requires_string_id() {
        let key = StructuredKey::from_value(&json!({ "id": "a", "group": "g", "data": 1 }))
            .expect("Key not decoded");
        assert_eq!(key.id(), "a");
        assert_eq!(key.group(), Some("g"));
        assert_eq!(key.data(), &json!(1));

        assert!(StructuredKey::from_value(&json!({ "id": 7 })).is_none());
        assert!(StructuredKey::from_value(&json!({ "data": "x" })).is_none());
        assert!(StructuredKey::from_value(&json!("id")).is_none());
    }

    #[test]
    fn test_raw_key_serialize() {
        assert_eq!(RawKey::from("/api/todos").serialize(), "/api/todos");
        assert_eq!(
            RawKey::Value(json!(["/api/user", 1])).serialize(),
            "@\"/api/user\",1,"
        );
        assert!(RawKey::from("$inf$/api/feed").is_internal());
        assert!(!RawKey::from(StructuredKey::new("a", json!("x"))).is_internal());
    }

    #[test]
    fn test_serde_omits_absent_group() {
        let key = StructuredKey::new("a", json!("x"));
        let json = serde_json::to_value(&key).expect("Failed to serialize");
        assert_eq!(json, json!({ "id": "a", "data": "x" }));
    }
}
