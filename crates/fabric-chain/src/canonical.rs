//! Deterministic JSON encoding used for hashing and persistence.
//!
//! Object keys are emitted in ascending code-point order, with `,` and `:`
//! as the only separators and no whitespace. Non-ASCII text is written as
//! raw UTF-8; only characters JSON requires to be escaped are escaped.

use serde::Serialize;
use serde_json::Value;

/// Encode any serializable record into its canonical byte form.
///
/// Key order is imposed here rather than inherited from `serde_json::Map`,
/// so the result does not depend on the map's iteration order.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    let mut out = Vec::with_capacity(256);
    write_value(&mut out, &value)?;
    Ok(out)
}

/// Canonical encoding as a `String`, for line-oriented storage.
pub fn canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let bytes = canonical_bytes(value)?;
    // The encoder only ever writes UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_value(out, item)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}
