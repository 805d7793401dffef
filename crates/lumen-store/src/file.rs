use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use lumen_canon::{ContentKey, Document, ID_FIELD};
use lumen_types::{BlobId, DocumentId};
use serde::{Deserialize, Serialize};

use crate::error::{poisoned, StoreError, StoreResult};
use crate::query::{Projection, Query};
use crate::traits::{blob_id_for, BlobStore, DocumentStore};

const BLOB_MAGIC: &[u8; 4] = b"LMNB";
const BLOB_VERSION: u32 = 1;
const BLOB_HEADER_LEN: usize = 12;

/// Write `bytes` to `path` via a uniquely named sibling temp file and
/// rename, so readers never observe a half-written record and concurrent
/// writers of the same record never share a temp file.
fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Filesystem blob store.
///
/// Each blob is one file under `<root>/<aa>/<rest>.blob`, fanned out by the
/// first byte of its content-derived id. Writing bytes that are already
/// present rewrites the same file. A file holds a 12-byte header (magic,
/// version, CRC32 of the uncompressed bytes) followed by the zstd body.
#[derive(Debug)]
pub struct FileBlobStore {
    root: PathBuf,
    compression_level: i32,
}

impl FileBlobStore {
    /// Open (creating if needed) a blob store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, compression_level: i32) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), compression_level, "opened blob store");
        Ok(Self {
            root,
            compression_level,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &BlobId) -> PathBuf {
        let hex = id.to_hex();
        let (fan, rest) = hex.split_at(2);
        self.root.join(fan).join(format!("{rest}.blob"))
    }

    fn encode(&self, bytes: &[u8]) -> StoreResult<Vec<u8>> {
        let compressed = zstd::encode_all(bytes, self.compression_level)?;
        let mut out = Vec::with_capacity(BLOB_HEADER_LEN + compressed.len());
        out.extend_from_slice(BLOB_MAGIC);
        out.extend_from_slice(&BLOB_VERSION.to_be_bytes());
        out.extend_from_slice(&crc32fast::hash(bytes).to_be_bytes());
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    fn decode(id: &BlobId, data: &[u8]) -> StoreResult<Vec<u8>> {
        let corrupt = |reason: String| StoreError::Corrupt {
            key: id.to_hex(),
            reason,
        };
        if data.len() < BLOB_HEADER_LEN {
            return Err(corrupt("blob file too short".into()));
        }
        let (header, body) = data.split_at(BLOB_HEADER_LEN);
        if &header[0..4] != BLOB_MAGIC {
            return Err(corrupt("bad magic".into()));
        }
        let version = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if version != BLOB_VERSION {
            return Err(corrupt(format!("unsupported version {version}")));
        }
        let expected = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let bytes = zstd::decode_all(body).map_err(|e| corrupt(e.to_string()))?;
        let actual = crc32fast::hash(&bytes);
        if actual != expected {
            return Err(corrupt(format!(
                "crc mismatch: expected {expected:08x}, got {actual:08x}"
            )));
        }
        Ok(bytes)
    }
}

impl BlobStore for FileBlobStore {
    fn put(&self, bytes: &[u8]) -> StoreResult<BlobId> {
        let id = blob_id_for(bytes);
        write_atomic(&self.path_for(&id), &self.encode(bytes)?)?;
        tracing::trace!(blob = %id.short_hex(), size = bytes.len(), "wrote blob");
        Ok(id)
    }

    fn get(&self, id: &BlobId) -> StoreResult<Vec<u8>> {
        let path = self.path_for(id);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("blob {id}")));
            }
            Err(e) => return Err(e.into()),
        };
        Self::decode(id, &data)
    }

    fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        Ok(self.path_for(id).is_file())
    }
}

/// On-disk shape of one document file.
#[derive(Serialize, Deserialize)]
struct DocumentRecord {
    key: String,
    doc: Document,
}

fn key_from_hex(s: &str) -> Option<ContentKey> {
    let bytes = hex::decode(s).ok()?;
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Some(ContentKey::from_hash(arr))
}

#[derive(Default)]
struct DocumentIndex {
    docs: HashMap<DocumentId, Document>,
    by_key: HashMap<ContentKey, Vec<DocumentId>>,
}

impl DocumentIndex {
    fn add(&mut self, id: DocumentId, key: ContentKey, doc: Document) {
        self.docs.insert(id, doc);
        self.by_key.entry(key).or_default().push(id);
    }
}

/// Filesystem document store.
///
/// Each document is one JSON file `<root>/<id>.json` holding the document
/// and its content key. The whole store is loaded into an in-memory index
/// on open; writes go to disk first and to the index second.
pub struct FileDocumentStore {
    root: PathBuf,
    index: RwLock<DocumentIndex>,
}

impl FileDocumentStore {
    /// Open (creating if needed) a document store rooted at `root`,
    /// rebuilding the index from the files present.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut index = DocumentIndex::default();
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id: DocumentId = stem.parse().map_err(|_| StoreError::Corrupt {
                key: stem.to_owned(),
                reason: "file name is not a document id".into(),
            })?;
            let record: DocumentRecord = serde_json::from_slice(&fs::read(&path)?)
                .map_err(|e| StoreError::Corrupt {
                    key: stem.to_owned(),
                    reason: e.to_string(),
                })?;
            let key = key_from_hex(&record.key).ok_or_else(|| StoreError::Corrupt {
                key: stem.to_owned(),
                reason: "bad content key".into(),
            })?;
            index.add(id, key, record.doc);
        }

        tracing::debug!(
            root = %root.display(),
            documents = index.docs.len(),
            "opened document store"
        );
        Ok(Self {
            root,
            index: RwLock::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of documents in the store.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.index.read().map_err(poisoned)?.docs.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn path_for(&self, id: &DocumentId) -> PathBuf {
        self.root.join(format!("{}.json", id.to_hex()))
    }
}

impl DocumentStore for FileDocumentStore {
    fn find_one(&self, query: &Query, projection: Projection) -> StoreResult<Option<Document>> {
        let index = self.index.read().map_err(poisoned)?;
        let Some(candidates) = index.by_key.get(&query.key()) else {
            return Ok(None);
        };
        Ok(candidates
            .iter()
            .filter_map(|id| index.docs.get(id))
            .find(|doc| query.matches(doc))
            .map(|doc| projection.apply(doc)))
    }

    fn insert(&self, mut doc: Document, key: ContentKey) -> StoreResult<DocumentId> {
        let id = DocumentId::generate();
        let id_value =
            serde_json::to_value(id).map_err(|e| StoreError::Serialization(e.to_string()))?;
        doc.insert(ID_FIELD.to_owned(), id_value);

        let record = DocumentRecord {
            key: key.to_hex(),
            doc,
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&self.path_for(&id), &bytes)?;

        self.index
            .write()
            .map_err(poisoned)?
            .add(id, key, record.doc);
        tracing::trace!(doc = %id.short_hex(), key = %key.short_hex(), "wrote document");
        Ok(id)
    }

    fn get(&self, id: &DocumentId) -> StoreResult<Option<Document>> {
        Ok(self.index.read().map_err(poisoned)?.docs.get(id).cloned())
    }
}

impl std::fmt::Debug for FileDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.index.read().map(|i| i.docs.len()).unwrap_or_default();
        f.debug_struct("FileDocumentStore")
            .field("root", &self.root)
            .field("document_count", &count)
            .finish()
    }
}
