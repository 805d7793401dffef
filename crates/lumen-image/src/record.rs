use std::any::Any;
use std::sync::Arc;

use lumen_canon::Document;
use lumen_entity::document::{envelope, optional, read_id, required, to_value, type_tag};
use lumen_entity::{Entity, EntityError, EntityResult, EntityType, Resolver};
use lumen_store::{BlobRefStore, DocumentStore, Payload};
use lumen_types::{BlobId, CameraIntrinsics, DocumentId, ImageMetadata, Transform};
use serde_json::{Map, Value};

use crate::channel::{BlobRef, Channel, ChannelKind};

/// Tag of single-camera image documents.
pub const MONO_TAG: &str = "Image";
/// Tag of stereo-pair image documents.
pub const STEREO_TAG: &str = "StereoImage";

/// Which camera of a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn prefix(self) -> &'static str {
        match self {
            Self::Left => "left_",
            Self::Right => "right_",
        }
    }
}

/// What one camera saw: its pose and its four channels.
#[derive(Debug)]
pub struct View {
    pose: Transform,
    colour: BlobRef,
    depth: BlobRef,
    labels: BlobRef,
    world_normals: BlobRef,
}

impl View {
    /// A view with only the colour channel. Pass a [`Payload`] for new data
    /// or a [`BlobId`] for data already in the blob store.
    pub fn new(pose: Transform, colour: impl Into<BlobRef>) -> Self {
        Self {
            pose,
            colour: colour.into(),
            depth: BlobRef::absent(),
            labels: BlobRef::absent(),
            world_normals: BlobRef::absent(),
        }
    }

    pub fn with_depth(mut self, depth: impl Into<BlobRef>) -> Self {
        self.depth = depth.into();
        self
    }

    pub fn with_labels(mut self, labels: impl Into<BlobRef>) -> Self {
        self.labels = labels.into();
        self
    }

    pub fn with_world_normals(mut self, normals: impl Into<BlobRef>) -> Self {
        self.world_normals = normals.into();
        self
    }

    pub fn pose(&self) -> &Transform {
        &self.pose
    }

    pub fn channel(&self, kind: ChannelKind) -> &BlobRef {
        match kind {
            ChannelKind::Colour => &self.colour,
            ChannelKind::Depth => &self.depth,
            ChannelKind::Labels => &self.labels,
            ChannelKind::WorldNormals => &self.world_normals,
        }
    }

    fn write_fields(&self, doc: &mut Document, prefix: &str, pose_field: &str) -> EntityResult<()> {
        let tag = if prefix.is_empty() { MONO_TAG } else { STEREO_TAG };
        doc.insert(pose_field.to_owned(), to_value(tag, &self.pose)?);
        for kind in ChannelKind::ALL {
            let field = format!("{prefix}{}", kind.field());
            let value = match self.channel(kind).state()? {
                Channel::Absent => Value::Null,
                channel => {
                    let id = channel.id().ok_or_else(|| {
                        EntityError::schema(tag, format!("channel `{field}` has not been persisted"))
                    })?;
                    to_value(tag, &id)?
                }
            };
            doc.insert(field, value);
        }
        Ok(())
    }

    fn read_fields(doc: &Document, prefix: &str, pose_field: &str) -> EntityResult<Self> {
        let channel = |kind: ChannelKind| -> EntityResult<BlobRef> {
            let id: Option<BlobId> = optional(doc, &format!("{prefix}{}", kind.field()))?;
            Ok(BlobRef::from_stored_id(id))
        };
        let colour_field = format!("{prefix}{}", ChannelKind::Colour.field());
        let colour: BlobId = required(doc, &colour_field)?;
        Ok(Self {
            pose: required(doc, pose_field)?,
            colour: BlobRef::stored(colour),
            depth: channel(ChannelKind::Depth)?,
            labels: channel(ChannelKind::Labels)?,
            world_normals: channel(ChannelKind::WorldNormals)?,
        })
    }
}

/// A single frame: one or two camera views plus metadata.
///
/// Channels are loaded from the blob store on first access and kept in
/// memory afterwards. A record decoded through a [`Resolver`] reads from the
/// resolver's blob store; a freshly built record reads from the store it was
/// persisted to.
#[derive(Debug)]
pub struct ImageRecord {
    id: Option<DocumentId>,
    metadata: ImageMetadata,
    additional_metadata: Map<String, Value>,
    left: View,
    right: Option<View>,
    source: Option<BlobRefStore>,
}

impl ImageRecord {
    /// A single-camera image. Fails if the view has no colour channel.
    pub fn mono(view: View, metadata: ImageMetadata) -> EntityResult<Self> {
        Self::build(view, None, metadata)
    }

    /// A stereo pair. Fails if either view has no colour channel.
    pub fn stereo(left: View, right: View, metadata: ImageMetadata) -> EntityResult<Self> {
        Self::build(left, Some(right), metadata)
    }

    fn build(left: View, right: Option<View>, metadata: ImageMetadata) -> EntityResult<Self> {
        let tag = if right.is_some() { STEREO_TAG } else { MONO_TAG };
        for view in std::iter::once(&left).chain(right.as_ref()) {
            if !view.colour.is_present()? {
                return Err(EntityError::schema(tag, "colour channel is required"));
            }
        }
        Ok(Self {
            id: None,
            metadata,
            additional_metadata: Map::new(),
            left,
            right,
            source: None,
        })
    }

    /// Attach free-form key/value data carried verbatim in the document.
    pub fn with_additional_metadata(mut self, extra: Map<String, Value>) -> Self {
        self.additional_metadata = extra;
        self
    }

    pub fn is_stereo(&self) -> bool {
        self.right.is_some()
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn additional_metadata(&self) -> &Map<String, Value> {
        &self.additional_metadata
    }

    pub fn view(&self, side: Side) -> Option<&View> {
        match side {
            Side::Left => Some(&self.left),
            Side::Right => self.right.as_ref(),
        }
    }

    fn views(&self) -> impl Iterator<Item = &View> {
        std::iter::once(&self.left).chain(self.right.as_ref())
    }

    /// Pose of the (left) camera.
    pub fn camera_pose(&self) -> &Transform {
        &self.left.pose
    }

    pub fn right_camera_pose(&self) -> Option<&Transform> {
        self.right.as_ref().map(|v| &v.pose)
    }

    /// Distance between the two cameras of a stereo pair.
    pub fn stereo_baseline(&self) -> Option<f64> {
        self.right_camera_pose()
            .map(|right| self.left.pose.distance_to(right))
    }

    pub fn intrinsics(&self) -> Option<&CameraIntrinsics> {
        self.metadata.intrinsics.as_ref()
    }

    pub fn right_intrinsics(&self) -> Option<&CameraIntrinsics> {
        self.metadata.right_intrinsics.as_ref()
    }

    /// Whether every camera carries `kind`. Never touches the blob store.
    pub fn has_channel(&self, kind: ChannelKind) -> EntityResult<bool> {
        for view in self.views() {
            if !view.channel(kind).is_present()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Use `store` for lazy channel loads.
    pub fn attach(&mut self, store: BlobRefStore) {
        self.source = Some(store);
    }

    /// Payload of one channel, loading it on first access.
    pub fn channel(&self, side: Side, kind: ChannelKind) -> EntityResult<Option<Arc<Payload>>> {
        let Some(view) = self.view(side) else {
            return Ok(None);
        };
        let name = if self.is_stereo() {
            format!("{}{}", side.prefix(), kind.field())
        } else {
            kind.field().to_owned()
        };
        view.channel(kind).load(self.source.as_ref(), &name)
    }

    /// Colour image of the (left) camera.
    pub fn colour(&self) -> EntityResult<Arc<Payload>> {
        self.channel(Side::Left, ChannelKind::Colour)?
            .ok_or_else(|| EntityError::schema(self.type_tag(), "colour channel is absent"))
    }

    pub fn depth(&self) -> EntityResult<Option<Arc<Payload>>> {
        self.channel(Side::Left, ChannelKind::Depth)
    }

    pub fn labels(&self) -> EntityResult<Option<Arc<Payload>>> {
        self.channel(Side::Left, ChannelKind::Labels)
    }

    pub fn world_normals(&self) -> EntityResult<Option<Arc<Payload>>> {
        self.channel(Side::Left, ChannelKind::WorldNormals)
    }

    /// Write every channel that has no blob id yet, or every present channel
    /// if `force` is set. Returns the number of channels written.
    ///
    /// Calling this twice without `force` writes nothing the second time.
    pub fn persist_payloads(&mut self, store: &BlobRefStore, force: bool) -> EntityResult<usize> {
        let mut written = 0;
        for view in std::iter::once(&self.left).chain(self.right.as_ref()) {
            for kind in ChannelKind::ALL {
                let channel = view.channel(kind);
                let before = channel.id()?;
                let after = channel.persist(store, force)?;
                if after.is_some() && (force || before.is_none()) {
                    written += 1;
                }
            }
        }
        if self.source.is_none() {
            self.source = Some(store.clone());
        }
        Ok(written)
    }

    /// Persist payloads, then dedup-save the document.
    pub fn save_with_payloads(
        &mut self,
        docs: &dyn DocumentStore,
        blobs: &BlobRefStore,
    ) -> EntityResult<DocumentId> {
        self.persist_payloads(blobs, false)?;
        self.save(docs)
    }

    /// Structural sanity check that never touches the blob store.
    ///
    /// Every camera must carry colour, and any payload already in memory must
    /// match the image size in the metadata.
    pub fn validate(&self) -> bool {
        let expected = (self.metadata.height as usize, self.metadata.width as usize);
        self.views().all(|view| {
            ChannelKind::ALL.iter().all(|&kind| match view.channel(kind).state() {
                Ok(Channel::Absent) => !kind.is_mandatory(),
                Ok(Channel::Stored(_)) => true,
                Ok(Channel::InMemory { payload, .. }) => {
                    payload.dimensions().map_or(true, |dims| dims == expected)
                }
                Err(_) => false,
            })
        })
    }

    /// Compare two records by content, loading payloads as needed.
    ///
    /// Payloads compare element-wise, poses exactly, and metadata by value.
    /// Ids are ignored.
    pub fn content_eq(&self, other: &Self) -> EntityResult<bool> {
        if self.is_stereo() != other.is_stereo()
            || self.metadata != other.metadata
            || self.additional_metadata != other.additional_metadata
        {
            return Ok(false);
        }
        for side in [Side::Left, Side::Right] {
            let (Some(a), Some(b)) = (self.view(side), other.view(side)) else {
                continue;
            };
            if a.pose != b.pose {
                return Ok(false);
            }
            for kind in ChannelKind::ALL {
                if self.channel(side, kind)? != other.channel(side, kind)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

impl Entity for ImageRecord {
    fn type_tag(&self) -> &'static str {
        if self.is_stereo() {
            STEREO_TAG
        } else {
            MONO_TAG
        }
    }

    fn id(&self) -> Option<DocumentId> {
        self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = Some(id);
    }

    fn serialize(&self) -> EntityResult<Document> {
        let tag = self.type_tag();
        let mut doc = envelope(tag, self.id);
        match &self.right {
            None => self.left.write_fields(&mut doc, "", "pose")?,
            Some(right) => {
                self.left.write_fields(&mut doc, Side::Left.prefix(), "left_pose")?;
                right.write_fields(&mut doc, Side::Right.prefix(), "right_pose")?;
            }
        }
        doc.insert("metadata".into(), to_value(tag, &self.metadata)?);
        doc.insert(
            "additional_metadata".into(),
            Value::Object(self.additional_metadata.clone()),
        );
        Ok(doc)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl EntityType for ImageRecord {
    const TYPE_TAG: &'static str = MONO_TAG;

    fn deserialize(doc: &Document, resolver: &Resolver) -> EntityResult<Self> {
        let (left, right) = match type_tag(doc)? {
            MONO_TAG => (View::read_fields(doc, "", "pose")?, None),
            STEREO_TAG => (
                View::read_fields(doc, Side::Left.prefix(), "left_pose")?,
                Some(View::read_fields(doc, Side::Right.prefix(), "right_pose")?),
            ),
            other => {
                return Err(EntityError::schema(
                    other,
                    format!("unknown type tag, expected `{MONO_TAG}` or `{STEREO_TAG}`"),
                ))
            }
        };
        Ok(Self {
            id: read_id(doc)?,
            metadata: required(doc, "metadata")?,
            additional_metadata: optional(doc, "additional_metadata")?.unwrap_or_default(),
            left,
            right,
            source: Some(resolver.blobs().clone()),
        })
    }
}
