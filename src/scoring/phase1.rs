use crate::scoring::matching::{MatchingParams, OverlapMode};
use crate::scoring::{PairScore, TrackPair};
use crate::store::{Frame, FrameState, TrackHandle, TrackStore};
use crate::utils::bbox::BoundingBox;
use anyhow::Result;
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Sparse matrix of phase-1 records, keyed by ordered track pair. `BTreeMap`
/// keeps iteration (and thus everything phase 2 derives from it)
/// reproducible across runs.
pub type ScoreMatrix = BTreeMap<TrackPair, Track2TrackScore>;

/// Per track-pair aggregate produced by the phase-1 scan. Immutable once the
/// pair's scan completes.
///
#[derive(Clone, Debug, Default)]
pub struct Track2TrackScore {
    /// Aligned in-AOI frame pairs examined
    pub frames_compared: usize,
    /// Frame pairs that passed the overlap test
    pub frames_overlapping: usize,
    /// Accumulated intersection area over overlapping frames
    pub overlap_area: f64,
    /// Whether the pair satisfies the minimum-frames match policy
    pub matched: bool,
}

impl PairScore for Track2TrackScore {
    fn is_match(&self) -> bool {
        self.matched
    }

    fn frames_on_target(&self) -> usize {
        self.frames_overlapping
    }
}

enum Alignment {
    Aligned,
    GtBehind,
    CtBehind,
}

/// Two frames align when their timestamps differ by at most the tolerance.
/// When either side lacks timestamps the frame numbers must be equal.
fn align(gt_frame: &Frame, ct_frame: &Frame, tolerance_us: u64) -> Alignment {
    match (gt_frame.timestamp(), ct_frame.timestamp()) {
        (Some(gt_ts), Some(ct_ts)) => {
            if gt_ts.abs_diff(ct_ts) <= tolerance_us {
                Alignment::Aligned
            } else if gt_ts < ct_ts {
                Alignment::GtBehind
            } else {
                Alignment::CtBehind
            }
        }
        _ => {
            let (gt_num, ct_num) = (gt_frame.frame_number(), ct_frame.frame_number());
            if gt_num == ct_num {
                Alignment::Aligned
            } else if gt_num < ct_num {
                Alignment::GtBehind
            } else {
                Alignment::CtBehind
            }
        }
    }
}

/// Overlap test for one aligned frame pair. Returns the intersection-area
/// contribution on a hit, `None` otherwise.
fn frame_overlap(
    gt_box: &BoundingBox,
    ct_box: &BoundingBox,
    mode: OverlapMode,
    params: &MatchingParams,
) -> Option<f64> {
    if let OverlapMode::Radial(radius) = mode {
        if BoundingBox::center_distance(gt_box, ct_box) > radius {
            return None;
        }
        let size = params.point_detection_box_size;
        if size > 0.0 {
            let (gx, gy) = gt_box.center();
            let (cx, cy) = ct_box.center();
            return Some(BoundingBox::intersection(
                &BoundingBox::point_box(gx, gy, size),
                &BoundingBox::point_box(cx, cy, size),
            ));
        }
        return Some(0.0);
    }

    let (gt_box, ct_box) = match params.bbox_expansion {
        Some(margin) => (gt_box.expand(margin), ct_box.expand(margin)),
        None => (*gt_box, *ct_box),
    };
    let intersection = BoundingBox::intersection(&gt_box, &ct_box);

    let hit = match mode {
        OverlapMode::Radial(_) => unreachable!(),
        OverlapMode::Iou(threshold) => {
            let union = gt_box.area() + ct_box.area() - intersection;
            union > 0.0 && intersection / union >= threshold
        }
        OverlapMode::MinArea(min_area) => intersection >= min_area,
        OverlapMode::Percentage(gt_pcent, ct_pcent) => {
            let gt_ok =
                gt_pcent <= 0.0 || (gt_box.area() > 0.0 && intersection / gt_box.area() >= gt_pcent);
            let ct_ok =
                ct_pcent <= 0.0 || (ct_box.area() > 0.0 && intersection / ct_box.area() >= ct_pcent);
            intersection > 0.0 && gt_ok && ct_ok
        }
        OverlapMode::AnyPositive => intersection > 0.0,
    };

    hit.then_some(intersection)
}

struct PairResult {
    pair: TrackPair,
    score: Track2TrackScore,
    /// (handle, frame index) of every frame that passed the overlap test
    hit_frames: Vec<(TrackHandle, usize)>,
}

/// Scans one (gt, ct) pair with a two-pointer merge over the pre-sorted
/// frame sequences.
fn score_pair(
    store: &TrackStore,
    pair: TrackPair,
    mode: OverlapMode,
    tolerance_us: u64,
    params: &MatchingParams,
) -> Result<PairResult> {
    let gt_frames = store.get(pair.gt)?.frames();
    let ct_frames = store.get(pair.ct)?.frames();

    let mut score = Track2TrackScore::default();
    let mut hit_frames = Vec::new();

    let (mut i, mut j) = (0, 0);
    while i < gt_frames.len() && j < ct_frames.len() {
        let (gt_frame, ct_frame) = (&gt_frames[i], &ct_frames[j]);
        match align(gt_frame, ct_frame, tolerance_us) {
            Alignment::Aligned => {
                let in_aoi = gt_frame.state() != FrameState::OutsideAoi
                    && ct_frame.state() != FrameState::OutsideAoi;
                if in_aoi {
                    score.frames_compared += 1;
                    if let Some(area) =
                        frame_overlap(gt_frame.bbox(), ct_frame.bbox(), mode, params)
                    {
                        score.frames_overlapping += 1;
                        score.overlap_area += area;
                        hit_frames.push((pair.gt, i));
                        hit_frames.push((pair.ct, j));
                    }
                }
                i += 1;
                j += 1;
            }
            Alignment::GtBehind => i += 1,
            Alignment::CtBehind => j += 1,
        }
    }

    score.matched = params
        .min_frames
        .satisfied(score.frames_overlapping, gt_frames.len());

    Ok(PairResult {
        pair,
        score,
        hit_frames,
    })
}

/// Sets every frame's tri-state flag from AOI membership and refreshes each
/// track's frames-in-AOI lifetime counter. Running this up front leaves the
/// pairwise scan read-only, so pairs can be scored in parallel.
fn apply_aoi(
    store: &mut TrackStore,
    gt_handles: &[TrackHandle],
    ct_handles: &[TrackHandle],
    params: &MatchingParams,
) -> Result<()> {
    let handles = gt_handles
        .iter()
        .chain(ct_handles.iter())
        .copied()
        .sorted()
        .dedup()
        .collect::<Vec<_>>();

    for handle in handles {
        let track = store.get_mut(handle)?;
        let mut inside = 0;
        for frame in track.frames_mut() {
            if params.aoi.contains(frame.bbox()) {
                frame.set_state(FrameState::InAoiUnmatched);
                inside += 1;
            } else {
                frame.set_state(FrameState::OutsideAoi);
            }
        }
        track.set_frames_in_aoi(inside);
    }
    Ok(())
}

/// Phase 1: for every (ground truth, computed) pair, walks the aligned frame
/// sequences, applies the configured overlap test per frame and decides the
/// track-level match.
///
/// The cost is O(|G| x |C| x F) - exhaustive pairwise comparison dominates
/// the whole pipeline, which is why the pair scans run on the rayon pool.
/// Matched-flag updates are deferred and applied after the parallel merge,
/// so results are identical to a sequential scan.
///
/// Side effect on `store`: each frame's tri-state flag reflects AOI
/// membership and match status afterwards, and each track's frames-in-AOI
/// counter is refreshed. Phase 3 reads the counter as the track lifetime.
///
pub fn compute_scores(
    store: &mut TrackStore,
    gt_handles: &[TrackHandle],
    ct_handles: &[TrackHandle],
    params: &MatchingParams,
) -> Result<ScoreMatrix> {
    apply_aoi(store, gt_handles, ct_handles, params)?;

    let mode = params.overlap_mode();
    let tolerance_us = (params.frame_alignment_secs * 1_000_000.0).round() as u64;

    let pairs = gt_handles
        .iter()
        .cartesian_product(ct_handles.iter())
        .map(|(&gt, &ct)| TrackPair::new(gt, ct))
        .collect::<Vec<_>>();

    let snapshot: &TrackStore = store;
    let results = pairs
        .into_par_iter()
        .map(|pair| score_pair(snapshot, pair, mode, tolerance_us, params))
        .collect::<Result<Vec<_>>>()?;

    let mut scores = ScoreMatrix::new();
    for result in results {
        if result.score.matched {
            for (handle, idx) in &result.hit_frames {
                store.get_mut(*handle)?.frames_mut()[*idx].set_state(FrameState::InAoiMatched);
            }
        }
        let retain = result.score.matched
            || (params.pass_all_nonzero_overlaps && result.score.frames_overlapping > 0);
        if retain {
            scores.insert(result.pair, result.score);
        }
    }

    debug!(
        "Phase 1: {} x {} pairs scanned, {} retained",
        gt_handles.len(),
        ct_handles.len(),
        scores.len()
    );

    Ok(scores)
}
