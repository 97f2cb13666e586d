//! Canonical byte encoding for hash input.
//!
//! Hashing only ever sees canonical bytes: object keys sorted, minimal
//! separators, timestamps normalized to UTC with microsecond precision,
//! UUIDs in lowercase hyphenated form. Two semantically equal records encode
//! to identical bytes regardless of field insertion order, which is what
//! makes hashes and projection rebuilds reproducible.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Encode a JSON value to canonical bytes.
///
/// Keys are sorted at every nesting level and separators carry no whitespace
/// (`{"a":1,"b":[2,3]}`). Numbers and strings use `serde_json`'s standard
/// rendering, so any value that round-trips through `serde_json` encodes
/// stably.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    write_value(&mut out, value);
    out
}

/// Normalize a timestamp to the canonical textual form: RFC 3339 in UTC with
/// microsecond precision and a `Z` suffix.
pub fn canonical_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> String {
    ts.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Normalize an identifier to the canonical textual form: lowercase
/// hyphenated UUID.
pub fn canonical_id(id: &Uuid) -> String {
    id.hyphenated().to_string()
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // serde_json's default map is already key-ordered, but sorting
            // here keeps canonical output independent of feature flags
            // (preserve_order would silently change byte output otherwise).
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(out, key);
                out.push(b':');
                write_value(out, &map[key.as_str()]);
            }
            out.push(b'}');
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    // serde_json handles escaping; a &str never fails to serialize.
    let escaped = serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""));
    out.extend_from_slice(escaped.as_bytes());
}
