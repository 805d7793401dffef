use std::sync::{Arc, RwLock};

use lumen_entity::{EntityError, EntityResult};
use lumen_store::{BlobRefStore, Payload};
use lumen_types::BlobId;

/// One of the four data planes on an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    Colour,
    Depth,
    Labels,
    WorldNormals,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Colour,
        ChannelKind::Depth,
        ChannelKind::Labels,
        ChannelKind::WorldNormals,
    ];

    /// Document field holding this channel's blob id.
    pub fn field(self) -> &'static str {
        match self {
            Self::Colour => "data",
            Self::Depth => "depth_data",
            Self::Labels => "labels_data",
            Self::WorldNormals => "world_normals_data",
        }
    }

    /// Whether every image must carry this channel.
    pub fn is_mandatory(self) -> bool {
        self == Self::Colour
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Colour => write!(f, "colour"),
            Self::Depth => write!(f, "depth"),
            Self::Labels => write!(f, "labels"),
            Self::WorldNormals => write!(f, "world normals"),
        }
    }
}

/// State of one channel.
///
/// `Stored` becomes `InMemory` when the payload is first read. Nothing ever
/// moves a channel back to `Absent`.
#[derive(Clone, Debug, PartialEq)]
pub enum Channel {
    /// The image has no data for this channel.
    Absent,
    /// Durable in the blob store, not yet loaded.
    Stored(BlobId),
    /// Loaded or freshly constructed. `id` is set once durable.
    InMemory {
        payload: Arc<Payload>,
        id: Option<BlobId>,
    },
}

impl Channel {
    pub fn id(&self) -> Option<BlobId> {
        match self {
            Self::Absent => None,
            Self::Stored(id) => Some(*id),
            Self::InMemory { id, .. } => *id,
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Interior-mutable holder for a [`Channel`], so reads through `&self` can
/// load a stored payload on first access.
#[derive(Debug)]
pub struct BlobRef {
    state: RwLock<Channel>,
}

impl BlobRef {
    fn with(state: Channel) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn absent() -> Self {
        Self::with(Channel::Absent)
    }

    /// A channel already durable under `id`.
    pub fn stored(id: BlobId) -> Self {
        Self::with(Channel::Stored(id))
    }

    /// A channel whose payload has not been persisted yet.
    pub fn from_payload(payload: Payload) -> Self {
        Self::with(Channel::InMemory {
            payload: Arc::new(payload),
            id: None,
        })
    }

    /// Rebuild from a stored id field. A null id is an absent channel.
    pub fn from_stored_id(id: Option<BlobId>) -> Self {
        id.map_or_else(Self::absent, Self::stored)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> EntityResult<Channel> {
        Ok(self.read()?.clone())
    }

    pub fn id(&self) -> EntityResult<Option<BlobId>> {
        Ok(self.read()?.id())
    }

    pub fn is_present(&self) -> EntityResult<bool> {
        Ok(self.read()?.is_present())
    }

    /// Whether the payload is held in memory.
    pub fn is_loaded(&self) -> EntityResult<bool> {
        Ok(matches!(*self.read()?, Channel::InMemory { .. }))
    }

    /// Return the payload, fetching it from `source` on first access.
    ///
    /// An absent channel yields `Ok(None)` without touching the store.
    pub fn load(
        &self,
        source: Option<&BlobRefStore>,
        name: &str,
    ) -> EntityResult<Option<Arc<Payload>>> {
        let id = match &*self.read()? {
            Channel::Absent => return Ok(None),
            Channel::InMemory { payload, .. } => return Ok(Some(payload.clone())),
            Channel::Stored(id) => *id,
        };

        let source = source.ok_or_else(|| EntityError::Detached(name.to_owned()))?;
        let payload = Arc::new(source.fetch(id)?);

        let mut state = self.write()?;
        // Another reader may have loaded it while we were fetching.
        if let Channel::InMemory { payload, .. } = &*state {
            return Ok(Some(payload.clone()));
        }
        *state = Channel::InMemory {
            payload: payload.clone(),
            id: Some(id),
        };
        tracing::trace!(channel = name, blob = %id.short_hex(), "channel loaded");
        Ok(Some(payload))
    }

    /// Make the channel durable and return its id.
    ///
    /// A channel that already has an id is left alone unless `force` is set,
    /// in which case its payload is written again. A stored channel is
    /// loaded first so there is something to write.
    pub fn persist(&self, store: &BlobRefStore, force: bool) -> EntityResult<Option<BlobId>> {
        let current = self.state()?;
        let (payload, existing) = match current {
            Channel::Absent => return Ok(None),
            Channel::Stored(id) if !force => return Ok(Some(id)),
            Channel::Stored(id) => (Arc::new(store.fetch(id)?), Some(id)),
            Channel::InMemory { payload, id } => (payload, id),
        };

        let id = store.store(&payload, existing, force)?;
        *self.write()? = Channel::InMemory {
            payload,
            id: Some(id),
        };
        Ok(Some(id))
    }

    fn read(&self) -> EntityResult<std::sync::RwLockReadGuard<'_, Channel>> {
        self.state
            .read()
            .map_err(|e| EntityError::StoreUnavailable(format!("channel lock poisoned: {e}")))
    }

    fn write(&self) -> EntityResult<std::sync::RwLockWriteGuard<'_, Channel>> {
        self.state
            .write()
            .map_err(|e| EntityError::StoreUnavailable(format!("channel lock poisoned: {e}")))
    }
}

impl Default for BlobRef {
    fn default() -> Self {
        Self::absent()
    }
}

impl From<Payload> for BlobRef {
    fn from(payload: Payload) -> Self {
        Self::from_payload(payload)
    }
}

impl From<BlobId> for BlobRef {
    fn from(id: BlobId) -> Self {
        Self::stored(id)
    }
}

impl From<Option<Payload>> for BlobRef {
    fn from(payload: Option<Payload>) -> Self {
        payload.map_or_else(Self::absent, Self::from_payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_store::{BlobStore, InMemoryBlobStore};

    fn store() -> BlobRefStore {
        BlobRefStore::new(Arc::new(InMemoryBlobStore::new()))
    }

    fn depth() -> Payload {
        Payload::from_f32(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap()
    }

    #[test]
    fn null_id_is_absent() {
        let r = BlobRef::from_stored_id(None);
        assert!(!r.is_present().unwrap());
        assert_eq!(r.load(None, "depth").unwrap(), None);
    }

    #[test]
    fn persist_is_idempotent() {
        let store = store();
        let r = BlobRef::from_payload(depth());
        let first = r.persist(&store, false).unwrap();
        let second = r.persist(&store, false).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert!(store.backend().exists(&first.unwrap()).unwrap());
    }

    #[test]
    fn forced_persist_of_stored_channel_fetches_and_rewrites() {
        let store = store();
        let id = store.store(&depth(), None, false).unwrap();
        let r = BlobRef::stored(id);
        let forced = r.persist(&store, true).unwrap();
        assert_eq!(forced, Some(id));
        assert!(r.is_loaded().unwrap());
    }

    #[test]
    fn stored_channel_loads_on_first_access() {
        let store = store();
        let id = store.store(&depth(), None, false).unwrap();
        let r = BlobRef::stored(id);
        assert!(!r.is_loaded().unwrap());

        let payload = r.load(Some(&store), "depth").unwrap().unwrap();
        assert_eq!(*payload, depth());
        assert!(r.is_loaded().unwrap());
        assert_eq!(r.id().unwrap(), Some(id));
    }

    #[test]
    fn stored_channel_without_source_is_detached() {
        let r = BlobRef::stored(BlobId::from_u128(3));
        let err = r.load(None, "labels").unwrap_err();
        assert!(matches!(err, EntityError::Detached(ref c) if c == "labels"));
    }

    #[test]
    fn unknown_blob_is_not_found() {
        let r = BlobRef::stored(BlobId::from_u128(3));
        let err = r.load(Some(&store()), "colour").unwrap_err();
        assert!(matches!(err, EntityError::NotFound(_)));
    }

    #[test]
    fn channel_kind_fields() {
        let fields: Vec<_> = ChannelKind::ALL.iter().map(|k| k.field()).collect();
        assert_eq!(
            fields,
            vec!["data", "depth_data", "labels_data", "world_normals_data"]
        );
        assert!(ChannelKind::Colour.is_mandatory());
        assert!(!ChannelKind::Depth.is_mandatory());
    }
}
