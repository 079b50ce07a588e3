use crate::store::builder::TrackBuilder;
use crate::store::{TrackHandle, TrackStore};
use crate::utils::bbox::BoundingBox;

/// Stores a track with a single frame at frame 0 / t=0
///
pub fn single_frame_track(store: &mut TrackStore, id: u64, bbox: BoundingBox) -> TrackHandle {
    TrackBuilder::new(id).frame_at(0, 0, bbox).add_to(store)
}

/// Stores a track of `n` square boxes of side `size`, starting at `origin`
/// on frame `start` and translating by `step` every frame
///
pub fn steady_track(
    store: &mut TrackStore,
    id: u64,
    start: u64,
    n: usize,
    origin: (f64, f64),
    step: (f64, f64),
    size: f64,
) -> TrackHandle {
    let mut builder = TrackBuilder::new(id);
    for i in 0..n as u64 {
        let x = origin.0 + step.0 * i as f64;
        let y = origin.1 + step.1 * i as f64;
        builder = builder.frame(start + i, BoundingBox::new(x, y, size, size));
    }
    builder.add_to(store)
}
