//! Envelope and field helpers for entity documents.
//!
//! Every persisted entity is a JSON object carrying `_type` (the registry
//! tag) and, once saved, `_id`. The helpers here read and write those two
//! fields and decode typed fields with schema errors that name the entity.

use lumen_canon::{Document, ID_FIELD, TYPE_FIELD};
use lumen_types::DocumentId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{EntityError, EntityResult};

/// Start a document for an entity of type `tag`.
pub fn envelope(tag: &str, id: Option<DocumentId>) -> Document {
    let mut doc = Document::new();
    doc.insert(TYPE_FIELD.to_owned(), Value::String(tag.to_owned()));
    if let Some(id) = id {
        doc.insert(ID_FIELD.to_owned(), Value::String(id.to_string()));
    }
    doc
}

/// The document's type tag.
pub fn type_tag(doc: &Document) -> EntityResult<&str> {
    match doc.get(TYPE_FIELD) {
        Some(Value::String(tag)) => Ok(tag.as_str()),
        Some(other) => Err(EntityError::schema(
            "<untagged>",
            format!("`{TYPE_FIELD}` must be a string, got {other}"),
        )),
        None => Err(EntityError::schema(
            "<untagged>",
            format!("missing `{TYPE_FIELD}`"),
        )),
    }
}

/// Check that the document is tagged `expected`.
pub fn expect_tag(doc: &Document, expected: &str) -> EntityResult<()> {
    let found = type_tag(doc)?;
    if found != expected {
        return Err(EntityError::schema(
            found,
            format!("unknown type tag, expected `{expected}`"),
        ));
    }
    Ok(())
}

/// The document's `_id`, if it has been persisted.
pub fn read_id(doc: &Document) -> EntityResult<Option<DocumentId>> {
    match doc.get(ID_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|e| EntityError::schema(tag_or_unknown(doc), format!("bad `_id`: {e}"))),
        Some(other) => Err(EntityError::schema(
            tag_or_unknown(doc),
            format!("`{ID_FIELD}` must be a string, got {other}"),
        )),
    }
}

/// Decode a field that must be present and non-null.
pub fn required<T: DeserializeOwned>(doc: &Document, field: &str) -> EntityResult<T> {
    match doc.get(field) {
        None | Some(Value::Null) => Err(EntityError::schema(
            tag_or_unknown(doc),
            format!("missing field `{field}`"),
        )),
        Some(value) => decode(doc, field, value),
    }
}

/// Decode a field that older documents may lack. Missing or null is `None`.
pub fn optional<T: DeserializeOwned>(doc: &Document, field: &str) -> EntityResult<Option<T>> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode(doc, field, value).map(Some),
    }
}

/// Encode a value for storage in a document field.
pub fn to_value<T: Serialize>(tag: &str, value: &T) -> EntityResult<Value> {
    serde_json::to_value(value).map_err(|e| EntityError::schema(tag, e.to_string()))
}

fn decode<T: DeserializeOwned>(doc: &Document, field: &str, value: &Value) -> EntityResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| {
        EntityError::schema(tag_or_unknown(doc), format!("field `{field}`: {e}"))
    })
}

fn tag_or_unknown(doc: &Document) -> String {
    type_tag(doc).unwrap_or("<untagged>").to_owned()
}
