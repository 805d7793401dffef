use serde_json::{Map, Value};

/// A stored document: a JSON object with string keys.
pub type Document = Map<String, Value>;

/// Envelope field holding the store-assigned identifier.
pub const ID_FIELD: &str = "_id";
/// Envelope field holding the polymorphic type tag.
pub const TYPE_FIELD: &str = "_type";

/// Reduce a document to its canonical, order-independent form.
///
/// The `_id` envelope field is dropped (identity is never part of content)
/// and every top-level array named in `unordered` is sorted by the canonical
/// bytes of its elements. Object keys need no treatment here: they are sorted
/// when the canonical bytes are written.
pub fn canonicalize(doc: &Document, unordered: &[&str]) -> Document {
    doc.iter()
        .filter(|(key, _)| key.as_str() != ID_FIELD)
        .map(|(key, value)| {
            let value = if unordered.contains(&key.as_str()) {
                sort_set(value)
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// Deterministic byte encoding of a document: compact JSON with object keys
/// sorted at every depth, independent of the map implementation in use.
pub fn canonical_bytes(doc: &Document) -> Vec<u8> {
    let mut out = Vec::new();
    write_object(doc, &mut out);
    out
}

fn sort_set(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut keyed: Vec<(Vec<u8>, &Value)> = items
                .iter()
                .map(|item| {
                    let mut bytes = Vec::new();
                    write_value(item, &mut bytes);
                    (bytes, item)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Array(keyed.into_iter().map(|(_, v)| v.clone()).collect())
        }
        other => other.clone(),
    }
}

fn write_object(map: &Map<String, Value>, out: &mut Vec<u8>) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    out.push(b'{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        write_string(key, out);
        out.push(b':');
        if let Some(value) = map.get(key) {
            write_value(value, out);
        }
    }
    out.push(b'}');
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => write_object(map, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out);
            }
            out.push(b']');
        }
        Value::String(s) => write_string(s, out),
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(Value::String(s.to_owned()).to_string().as_bytes());
}
