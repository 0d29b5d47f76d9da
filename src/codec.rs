//! Decoding raw cache keys back into structured keys.
//!
//! Batch operations only see the keys the cache hands them, which may be the
//! original structured key, its serialized string, or a JSON string. Decoding
//! runs a fixed pipeline of strategies and stops at the first one that matches:
//!
//! 1. [`DecodeStrategy::Structured`] - the key already is a structured key
//!    (or a JSON object with a string `id`)
//! 2. [`DecodeStrategy::Legacy`] - the serialized `#id:"…",group:"…",data:"…",` form
//! 3. [`DecodeStrategy::Json`] - a JSON document describing a structured key
//!
//! A key that matches nothing decodes to `None`. That is not an error: callers
//! treat it as "does not match".

use crate::key::{RawKey, StructuredKey};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// Serialized structured key: quoted `id`, optional quoted `group`, optional quoted `data`.
static LEGACY_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r##"(?s)^#id:"((?:[^"\\]|\\.)*)",(?:group:"((?:[^"\\]|\\.)*)",)?(?:data:"((?:[^"\\]|\\.)*)",)?"##,
    )
    .expect("Invalid legacy key regex")
});

/// One way of reading a raw key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Identity passthrough for keys that are already structured.
    Structured,
    /// The cache's serialized key string.
    Legacy,
    /// A strict JSON document.
    Json,
}

impl DecodeStrategy {
    /// Priority order the pipeline tries strategies in.
    pub const ORDER: [DecodeStrategy; 3] = [
        DecodeStrategy::Structured,
        DecodeStrategy::Legacy,
        DecodeStrategy::Json,
    ];

    /// Attempt this strategy alone. `None` means "no match".
    pub fn attempt(self, raw: &RawKey) -> Option<Arc<StructuredKey>> {
        match self {
            DecodeStrategy::Structured => decode_structured(raw),
            DecodeStrategy::Legacy => decode_legacy(raw),
            DecodeStrategy::Json => decode_json(raw),
        }
    }
}

/// Decode a raw cache key into a structured key.
///
/// A key that already is structured comes back as the same `Arc`.
///
/// # Example
///
/// ```
/// use mutation_kit::{decode, RawKey};
///
/// let raw = RawKey::from(r#"#id:"user-1",group:"users",data:"/api/users/1","#);
/// let key = decode(&raw).expect("structured key");
/// assert_eq!(key.id(), "user-1");
/// assert_eq!(key.group(), Some("users"));
/// ```
pub fn decode(raw: &RawKey) -> Option<Arc<StructuredKey>> {
    decode_with_strategy(raw).map(|(_, key)| key)
}

/// Decode and report which strategy matched.
pub fn decode_with_strategy(raw: &RawKey) -> Option<(DecodeStrategy, Arc<StructuredKey>)> {
    DecodeStrategy::ORDER
        .iter()
        .find_map(|strategy| strategy.attempt(raw).map(|key| (*strategy, key)))
}

fn decode_structured(raw: &RawKey) -> Option<Arc<StructuredKey>> {
    match raw {
        RawKey::Structured(key) => Some(Arc::clone(key)),
        RawKey::Value(value @ Value::Object(_)) => StructuredKey::from_value(value).map(Arc::new),
        _ => None,
    }
}

fn decode_legacy(raw: &RawKey) -> Option<Arc<StructuredKey>> {
    let RawKey::Text(text) = raw else {
        return None;
    };
    let captures = LEGACY_KEY.captures(text)?;

    let id = unescape(captures.get(1)?.as_str())?;
    let group = match captures.get(2) {
        Some(segment) => Some(unescape(segment.as_str())?),
        None => None,
    };
    let data = match captures.get(3) {
        Some(segment) => Value::String(unescape(segment.as_str())?),
        None => Value::Null,
    };

    Some(Arc::new(StructuredKey::from_parts(id, group, data)))
}

fn decode_json(raw: &RawKey) -> Option<Arc<StructuredKey>> {
    let RawKey::Text(text) = raw else {
        return None;
    };
    let value: Value = serde_json::from_str(text).ok()?;
    StructuredKey::from_value(&value).map(Arc::new)
}

/// Undo JSON string escaping of a captured segment.
fn unescape(segment: &str) -> Option<String> {
    serde_json::from_str(&format!("\"{}\"", segment)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::encode;
    use serde_json::json;

    #[test]
    fn test_decode_structured_is_identity() {
        let key = Arc::new(StructuredKey::new("a", json!("x")));
        let raw = RawKey::Structured(Arc::clone(&key));

        let decoded = decode(&raw).expect("Key not decoded");
        assert!(Arc::ptr_eq(&decoded, &key));
    }

    #[test]
    fn test_decode_legacy_full() {
        let raw = RawKey::from(r#"#id:"user-1",group:"users",data:"/api/users/1","#);
        let (strategy, key) = decode_with_strategy(&raw).expect("Key not decoded");

        assert_eq!(strategy, DecodeStrategy::Legacy);
        assert_eq!(key.id(), "user-1");
        assert_eq!(key.group(), Some("users"));
        assert_eq!(key.data(), &json!("/api/users/1"));
    }

    #[test]
    fn test_decode_legacy_absent_segments() {
        let key = decode(&RawKey::from(r#"#id:"only","#)).expect("Key not decoded");
        assert_eq!(key.id(), "only");
        assert_eq!(key.group(), None);
        assert!(key.data().is_null());
    }

    #[test]
    fn test_decode_legacy_escaped_quotes() {
        let original = StructuredKey::new("search", json!("/search?q=\"rust\"&page=2"));
        let decoded = decode(&RawKey::Text(encode(&original))).expect("Key not decoded");
        assert_eq!(*decoded, original);
    }

    #[test]
    fn test_decode_legacy_unicode_and_control_chars() {
        let original =
            StructuredKey::new("ключ-🔑", json!("/api/日本語?x=1\n\ty")).with_group("grüppe");
        let decoded = decode(&RawKey::Text(encode(&original))).expect("Key not decoded");
        assert_eq!(*decoded, original);
    }

    #[test]
    fn test_decode_legacy_non_string_data_is_absent() {
        let original = StructuredKey::new("t", json!({ "u": 1 }));
        let decoded = decode(&RawKey::Text(encode(&original))).expect("Key not decoded");
        assert_eq!(decoded.id(), "t");
        assert!(decoded.data().is_null());
    }

    #[test]
    fn test_decode_json() {
        let raw = RawKey::from(r#"{"id":"cfg","group":"settings","data":{"page":1}}"#);
        let (strategy, key) = decode_with_strategy(&raw).expect("Key not decoded");

        assert_eq!(strategy, DecodeStrategy::Json);
        assert_eq!(key.id(), "cfg");
        assert_eq!(key.data(), &json!({ "page": 1 }));
    }

    #[test]
    fn test_decode_value_object() {
        let raw = RawKey::Value(json!({ "id": "v", "data": "/v" }));
        let (strategy, key) = decode_with_strategy(&raw).expect("Key not decoded");
        assert_eq!(strategy, DecodeStrategy::Structured);
        assert_eq!(key.id(), "v");
    }

    #[test]
    fn test_decode_failures_are_none() {
        assert!(decode(&RawKey::from("/api/todos")).is_none());
        assert!(decode(&RawKey::from("{not json")).is_none());
        assert!(decode(&RawKey::from("null")).is_none());
        assert!(decode(&RawKey::from(r#"{"data":"x"}"#)).is_none());
        assert!(decode(&RawKey::Value(json!(["/api", 1]))).is_none());
    }
}
