use lumen_canon::{canonicalize, ContentHasher, ContentKey, Document};

/// Canonical equality query for dedup-on-insert.
///
/// A query is built from the document about to be inserted. Its filter is
/// the document's canonical form and its key is the content hash of that
/// form, so a backend may answer either by scanning for an equal filter or
/// by looking the key up in an index.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    filter: Document,
    unordered: Vec<String>,
    key: ContentKey,
}

impl Query {
    /// Build the equality query matching `doc`, treating the named top-level
    /// fields as sets.
    pub fn for_document(doc: &Document, unordered: &[&str]) -> Self {
        Self {
            filter: canonicalize(doc, unordered),
            unordered: unordered.iter().map(|s| (*s).to_owned()).collect(),
            key: ContentHasher::DOCUMENT.key_of(doc, unordered),
        }
    }

    /// The canonical filter document.
    pub fn filter(&self) -> &Document {
        &self.filter
    }

    /// Content key of the filter.
    pub fn key(&self) -> ContentKey {
        self.key
    }

    /// Names of fields compared as sets.
    pub fn unordered(&self) -> impl Iterator<Item = &str> {
        self.unordered.iter().map(String::as_str)
    }

    /// Whether a stored document satisfies this query.
    pub fn matches(&self, stored: &Document) -> bool {
        let unordered: Vec<&str> = self.unordered().collect();
        canonicalize(stored, &unordered) == self.filter
    }
}

/// Which fields a `find_one` should return.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Projection {
    /// The whole document.
    #[default]
    Full,
    /// Only the `_id` envelope field.
    IdOnly,
}

impl Projection {
    pub(crate) fn apply(self, doc: &Document) -> Document {
        match self {
            Self::Full => doc.clone(),
            Self::IdOnly => doc
                .iter()
                .filter(|(k, _)| k.as_str() == lumen_canon::ID_FIELD)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}
