use crate::store::{Frame, Track, TrackHandle, TrackStore};
use crate::utils::bbox::BoundingBox;

/// Builder object for [Track]
///
pub struct TrackBuilder {
    external_id: u64,
    frames: Vec<Frame>,
}

impl TrackBuilder {
    /// Empty track constructor
    ///
    /// # Parameters
    /// * `external_id` - track ID as carried by the source format
    ///
    pub fn new(external_id: u64) -> Self {
        Self {
            external_id,
            frames: Vec::new(),
        }
    }

    /// Adds a frame identified by frame number only
    ///
    pub fn frame(mut self, frame_number: u64, bbox: BoundingBox) -> Self {
        self.frames.push(Frame::new(frame_number, None, bbox));
        self
    }

    /// Adds a frame carrying a timestamp (microseconds)
    ///
    pub fn frame_at(mut self, frame_number: u64, timestamp: u64, bbox: BoundingBox) -> Self {
        self.frames
            .push(Frame::new(frame_number, Some(timestamp), bbox));
        self
    }

    /// Builds the track. Frames are ordered by (timestamp, frame number) so
    /// the scoring precondition holds regardless of insertion order.
    ///
    pub fn build(mut self) -> Track {
        self.frames
            .sort_by_key(|f| (f.timestamp(), f.frame_number()));
        Track::new(self.external_id, self.frames)
    }

    /// Builds the track and stores it, returning the handle
    ///
    pub fn add_to(self, store: &mut TrackStore) -> TrackHandle {
        store.add_track(self.build())
    }
}
