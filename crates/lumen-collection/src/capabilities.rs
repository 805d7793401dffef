use lumen_entity::EntityResult;
use lumen_image::{ChannelKind, ImageRecord};

/// Availability flags of an aggregate, derived once from every member.
///
/// A flag is set only if every member has the capability. An aggregate with
/// no members has none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub depth: bool,
    pub labels: bool,
    pub normals: bool,
    pub stereo: bool,
    /// Every member's metadata lists at least one labelled object.
    pub bounding_boxes: bool,
}

impl Capabilities {
    pub fn of<'a, I>(members: I) -> EntityResult<Self>
    where
        I: IntoIterator<Item = &'a ImageRecord>,
    {
        let mut members = members.into_iter().peekable();
        if members.peek().is_none() {
            return Ok(Self::default());
        }
        let mut caps = Self {
            depth: true,
            labels: true,
            normals: true,
            stereo: true,
            bounding_boxes: true,
        };
        for image in members {
            caps.depth &= image.has_channel(ChannelKind::Depth)?;
            caps.labels &= image.has_channel(ChannelKind::Labels)?;
            caps.normals &= image.has_channel(ChannelKind::WorldNormals)?;
            caps.stereo &= image.is_stereo();
            caps.bounding_boxes &= !image.metadata().labelled_objects.is_empty();
        }
        Ok(caps)
    }
}
