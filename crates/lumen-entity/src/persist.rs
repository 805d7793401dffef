use lumen_canon::{Document, ID_FIELD};
use lumen_store::{DocumentStore, Projection, Query};
use lumen_types::DocumentId;

use crate::document::read_id;
use crate::error::{EntityError, EntityResult};

/// Return the id of a stored document equal to `doc`, inserting it first if
/// there is none.
///
/// Equality is over the canonical form: `_id` is ignored, key order is
/// irrelevant, and the arrays named in `unordered` compare as sets.
///
/// The lookup and the insert are separate store calls. Two callers saving
/// equal documents at the same time can both miss and both insert; callers
/// must serialize saves of the same logical record.
pub fn save_or_get(
    mut doc: Document,
    unordered: &[&str],
    store: &dyn DocumentStore,
) -> EntityResult<DocumentId> {
    doc.remove(ID_FIELD);
    let query = Query::for_document(&doc, unordered);

    if let Some(existing) = store.find_one(&query, Projection::IdOnly)? {
        let id = read_id(&existing)?.ok_or_else(|| {
            EntityError::schema("<match>", "store returned a match without `_id`")
        })?;
        tracing::debug!(doc = %id.short_hex(), key = %query.key().short_hex(), "dedup hit");
        return Ok(id);
    }

    let id = store.insert(doc, query.key())?;
    tracing::debug!(doc = %id.short_hex(), key = %query.key().short_hex(), "document inserted");
    Ok(id)
}
