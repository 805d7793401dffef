use std::collections::btree_map;
use std::collections::BTreeMap;

use lumen_image::ImageRecord;
use lumen_types::Timestamp;

/// Forward-only replay position over an aggregate, in ascending timestamp
/// order.
///
/// A cursor borrows the aggregate and owns its own position, so any number
/// of readers can walk the same aggregate independently. Nothing is loaded
/// ahead of the cursor; channels are fetched only when the caller reads them
/// from the returned record.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    images: &'a BTreeMap<Timestamp, ImageRecord>,
    remaining: btree_map::Iter<'a, Timestamp, ImageRecord>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(images: &'a BTreeMap<Timestamp, ImageRecord>) -> Self {
        Self {
            images,
            remaining: images.iter(),
        }
    }

    /// Rewind to the first frame.
    pub fn begin(&mut self) {
        self.remaining = self.images.iter();
    }

    /// The next record and its timestamp, or `None` once exhausted.
    pub fn get_next(&mut self) -> Option<(&'a ImageRecord, Timestamp)> {
        self.remaining.next().map(|(ts, image)| (image, *ts))
    }

    /// Whether every frame has been handed out.
    pub fn is_complete(&self) -> bool {
        self.remaining.len() == 0
    }

    /// Frames left before completion.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = (Timestamp, &'a ImageRecord);

    fn next(&mut self) -> Option<Self::Item> {
        self.remaining.next().map(|(ts, image)| (*ts, image))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.remaining.size_hint()
    }
}

impl ExactSizeIterator for Cursor<'_> {}
