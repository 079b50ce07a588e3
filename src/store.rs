use crate::utils::bbox::BoundingBox;
use crate::Errors;
use anyhow::Result;
use log::debug;

pub mod builder;

/// Opaque handle addressing a track inside a [TrackStore]. Handles are stable
/// for the lifetime of the store.
pub type TrackHandle = u64;

/// Per-frame matching state. Phase 1 sets `OutsideAoi` during the AOI
/// pre-pass and upgrades `InAoiUnmatched` to `InAoiMatched` when the frame
/// contributes to a passing overlap test.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FrameState {
    OutsideAoi,
    #[default]
    InAoiUnmatched,
    InAoiMatched,
}

/// A single observation of a track: frame number, optional timestamp in
/// microseconds, and the detection bounding box.
///
#[derive(Clone, Debug)]
pub struct Frame {
    frame_number: u64,
    timestamp: Option<u64>,
    bbox: BoundingBox,
    state: FrameState,
}

impl Frame {
    pub fn new(frame_number: u64, timestamp: Option<u64>, bbox: BoundingBox) -> Self {
        Self {
            frame_number,
            timestamp,
            bbox,
            state: FrameState::default(),
        }
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Timestamp in microseconds since the stream epoch, when the source
    /// format carries one.
    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: FrameState) {
        self.state = state;
    }
}

/// An ordered sequence of frames belonging to one trajectory.
///
/// Frames must be ordered by timestamp (falling back to frame number) before
/// scoring runs; [builder::TrackBuilder] orders them on build.
///
#[derive(Clone, Debug)]
pub struct Track {
    external_id: u64,
    frames: Vec<Frame>,
    frames_in_aoi: usize,
}

impl Track {
    pub fn new(external_id: u64, frames: Vec<Frame>) -> Self {
        Self {
            external_id,
            frames,
            frames_in_aoi: 0,
        }
    }

    pub fn external_id(&self) -> u64 {
        self.external_id
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames inside the AOI, i.e. the track lifetime used as the
    /// purity denominator. Valid after the phase-1 AOI pre-pass.
    pub fn frames_in_aoi(&self) -> usize {
        self.frames_in_aoi
    }

    pub(crate) fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    pub(crate) fn set_frames_in_aoi(&mut self, n: usize) {
        self.frames_in_aoi = n;
    }

    /// Whether the sequence respects the ordering precondition.
    pub fn is_ordered(&self) -> bool {
        self.frames
            .windows(2)
            .all(|w| sort_key(&w[0]) <= sort_key(&w[1]))
    }
}

fn sort_key(f: &Frame) -> (Option<u64>, u64) {
    (f.timestamp(), f.frame_number())
}

/// Arena owning all tracks of one scoring run. The scoring phases reference
/// tracks exclusively through [TrackHandle] indices.
///
#[derive(Default, Debug)]
pub struct TrackStore {
    tracks: Vec<Track>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_track(&mut self, track: Track) -> TrackHandle {
        let handle = self.tracks.len() as TrackHandle;
        debug!(
            "Store track: handle={} external_id={} frames={}",
            handle,
            track.external_id(),
            track.len()
        );
        self.tracks.push(track);
        handle
    }

    pub fn get(&self, handle: TrackHandle) -> Result<&Track> {
        self.tracks
            .get(handle as usize)
            .ok_or_else(|| Errors::MissingTrack(handle).into())
    }

    pub(crate) fn get_mut(&mut self, handle: TrackHandle) -> Result<&mut Track> {
        self.tracks
            .get_mut(handle as usize)
            .ok_or_else(|| Errors::MissingTrack(handle).into())
    }

    pub fn handles(&self) -> impl Iterator<Item = TrackHandle> + '_ {
        0..self.tracks.len() as TrackHandle
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
