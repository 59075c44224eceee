//! Deterministic cache keys.
//!
//! A key is `"<namespace>:<hex sha256>"` where the digest covers a canonical
//! JSON rendering of the payload: object keys sorted at every depth, compact
//! separators, UTF-8 strings left unescaped. The canonical form does not
//! depend on serde_json's `preserve_order` feature or on struct field order.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{ExplainerError, Result};

/// Build a cache key for `payload` under `namespace`.
///
/// Fails with [`ExplainerError::KeyConstruction`] when the payload cannot be
/// represented as JSON (for example a map keyed by a non-string type).
pub fn build_key<T: Serialize + ?Sized>(namespace: &str, payload: &T) -> Result<String> {
    let value = serde_json::to_value(payload)
        .map_err(|e| ExplainerError::KeyConstruction(format!("{namespace}: {e}")))?;

    let mut canonical = String::new();
    write_canonical(&value, &mut canonical);

    let digest = Sha256::digest(canonical.as_bytes());
    Ok(format!("{namespace}:{}", hex::encode(digest)))
}

/// Short form of a key for log lines: namespace plus the first 8 hex chars.
pub fn short_key(key: &str) -> &str {
    let mut end = key.find(':').map_or(8, |colon| colon + 1 + 8).min(key.len());
    while end > 0 && !key.is_char_boundary(end) {
        end -= 1;
    }
    &key[..end]
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // A JSON string literal; cannot fail for a String.
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
