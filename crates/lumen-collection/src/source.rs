use lumen_image::ImageRecord;
use lumen_types::Timestamp;

use crate::capabilities::Capabilities;
use crate::cursor::Cursor;
use crate::sequence_type::SequenceType;

/// Read contract shared by image collections and sequences.
pub trait ImageSource {
    fn sequence_type(&self) -> SequenceType;

    /// Number of frames.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The frame at `timestamp`, or `None` if there is none.
    fn get(&self, timestamp: Timestamp) -> Option<&ImageRecord>;

    /// All frame timestamps in ascending order.
    fn timestamps(&self) -> &[Timestamp];

    /// A fresh cursor positioned at the first frame.
    fn begin(&self) -> Cursor<'_>;

    /// Whether frames can be fetched by key rather than only replayed.
    fn supports_random_access(&self) -> bool;

    /// Availability flags, computed when the aggregate was built.
    fn capabilities(&self) -> Capabilities;

    fn depth_available(&self) -> bool {
        self.capabilities().depth
    }

    fn labels_available(&self) -> bool {
        self.capabilities().labels
    }

    fn normals_available(&self) -> bool {
        self.capabilities().normals
    }

    fn stereo_available(&self) -> bool {
        self.capabilities().stereo
    }

    fn bounding_boxes_available(&self) -> bool {
        self.capabilities().bounding_boxes
    }

    /// True iff every member passes its own validity check.
    fn validate(&self) -> bool;
}
