use crate::store::{TrackHandle, TrackStore};
use anyhow::Result;
use log::info;

/// Matching policy value object and validation
pub mod matching;

/// Phase 1: frame-level pairwise overlap matcher
pub mod phase1;

/// Phase 2: association resolver
pub mod phase2;

/// Phase 3: metrics aggregator
pub mod phase3;

use matching::MatchingParams;
use phase2::Associations;
use phase3::ScoreStats;

/// Ordered (ground truth, computed) pair used as the map key throughout
/// phases 1-3. At most one phase-1 record exists per pair.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackPair {
    pub gt: TrackHandle,
    pub ct: TrackHandle,
}

impl TrackPair {
    pub fn new(gt: TrackHandle, ct: TrackHandle) -> Self {
        Self { gt, ct }
    }
}

/// Capability surface the phase-2 reduction needs from a per-pair score, so
/// the same resolver serves other score types (events, activities) that
/// expose a match decision and a frame count.
///
pub trait PairScore {
    /// Whether the pair passed the match threshold policy
    fn is_match(&self) -> bool;

    /// Frames the computed track overlaps the target
    fn frames_on_target(&self) -> usize;
}

/// Complete output of one scoring run.
///
pub struct ScoreOutput {
    pub scores: phase1::ScoreMatrix,
    pub associations: Associations,
    pub stats: ScoreStats,
}

/// Runs the full pipeline: policy validation, then phases 1-3 in order.
///
/// The only mutation of `store` is the documented frame-flag side effect of
/// phase 1; all other outputs are fresh data structures.
///
pub fn score_tracks(
    store: &mut TrackStore,
    gt_handles: &[TrackHandle],
    ct_handles: &[TrackHandle],
    params: &MatchingParams,
) -> Result<ScoreOutput> {
    params.sanity_check()?;

    info!(
        "Scoring {} ground-truth tracks against {} computed tracks",
        gt_handles.len(),
        ct_handles.len()
    );

    let scores = phase1::compute_scores(store, gt_handles, ct_handles, params)?;
    let associations = phase2::resolve(&scores, gt_handles, ct_handles);
    let stats = phase3::aggregate(&associations, store)?;

    Ok(ScoreOutput {
        scores,
        associations,
        stats,
    })
}

#[cfg(test)]
mod pipeline_tests {
    use crate::scoring::matching::{MatchingParams, MinFrames};
    use crate::scoring::{score_tracks, TrackPair};
    use crate::store::TrackStore;
    use crate::test_stuff::{single_frame_track, steady_track};
    use crate::utils::bbox::BoundingBox;
    use crate::EPS;

    #[test]
    fn end_to_end_quarter_iou_match() {
        // GT: one frame at t=0, box (0,0)-(10,10); CT: (5,5)-(15,15), IoU 1/7.
        // With IoU threshold 0.1 and min-frames 1, everything associates.
        let mut store = TrackStore::new();
        let g = single_frame_track(&mut store, 1, BoundingBox::from_corners(0.0, 0.0, 10.0, 10.0));
        let c = single_frame_track(&mut store, 2, BoundingBox::from_corners(5.0, 5.0, 15.0, 15.0));

        let params = MatchingParams::default()
            .with_iou(0.1)
            .with_min_frames(MinFrames::Absolute(1));

        let out = score_tracks(&mut store, &[g], &[c], &params).unwrap();

        let pair = TrackPair::new(g, c);
        let score = &out.scores[&pair];
        assert!(score.matched);
        assert_eq!(score.frames_overlapping, 1);

        assert_eq!(out.associations.gt_to_ct[&g], vec![c]);
        assert_eq!(out.associations.ct_to_gt[&c], vec![g]);
        let scalars = &out.associations.scalars[&pair];
        assert!(scalars.computed_dominated_by_target);
        assert!(scalars.target_dominated_by_computed);

        let gt_stats = &out.stats.gt_stats[&g];
        let ct_stats = &out.stats.ct_stats[&c];
        assert_eq!(gt_stats.continuity, 1);
        assert_eq!(ct_stats.continuity, 1);
        assert!((gt_stats.purity - 1.0).abs() < EPS);
        assert!((ct_stats.purity - 1.0).abs() < EPS);
        assert!((out.stats.overall.track_pd - 1.0).abs() < EPS);
        assert!((out.stats.overall.track_fa - 0.0).abs() < EPS);
    }

    #[test]
    fn end_to_end_disjoint_boxes() {
        let mut store = TrackStore::new();
        let g = single_frame_track(&mut store, 1, BoundingBox::from_corners(0.0, 0.0, 10.0, 10.0));
        let c = single_frame_track(
            &mut store,
            2,
            BoundingBox::from_corners(100.0, 100.0, 110.0, 110.0),
        );

        let params = MatchingParams::default()
            .with_iou(0.2)
            .with_min_frames(MinFrames::Absolute(1));

        let out = score_tracks(&mut store, &[g], &[c], &params).unwrap();

        assert!(out.scores.is_empty());
        assert!(out.associations.gt_to_ct[&g].is_empty());
        assert!((out.stats.overall.track_pd - 0.0).abs() < EPS);
        assert!((out.stats.overall.track_fa - 1.0).abs() < EPS);
    }

    #[test]
    fn self_match_identity() {
        // Scoring a collection against itself yields one matching pair per
        // track with full frame overlap.
        let mut store = TrackStore::new();
        let t1 = steady_track(&mut store, 1, 0, 10, (0.0, 0.0), (2.0, 0.0), 8.0);
        let t2 = steady_track(&mut store, 2, 3, 15, (50.0, 50.0), (0.0, 3.0), 12.0);
        let handles = [t1, t2];

        let params = MatchingParams::default();
        let out = score_tracks(&mut store, &handles, &handles, &params).unwrap();

        assert_eq!(out.scores.len(), 2);
        for &h in &handles {
            let score = &out.scores[&TrackPair::new(h, h)];
            assert!(score.matched);
            assert_eq!(
                score.frames_overlapping,
                store.get(h).unwrap().len(),
                "self pair must overlap on every frame"
            );
        }
    }

    #[test]
    fn randomized_tracks_keep_invariants() {
        use rand::prelude::*;

        let _ = env_logger::builder().is_test(true).try_init();
        let mut rng = rand::thread_rng();
        let mut store = TrackStore::new();

        let mut handles = Vec::new();
        for id in 0..20u64 {
            let start = rng.gen_range(0..20);
            let n = rng.gen_range(1..40);
            let origin = (rng.gen_range(0.0..200.0), rng.gen_range(0.0..200.0));
            let step = (rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
            handles.push(steady_track(&mut store, id, start, n, origin, step, 12.0));
        }
        let (gt, ct) = handles.split_at(10);

        let params = MatchingParams::default().with_min_frames(MinFrames::Absolute(2));
        let out = score_tracks(&mut store, gt, ct, &params).unwrap();

        for stats in out
            .stats
            .gt_stats
            .values()
            .chain(out.stats.ct_stats.values())
        {
            assert!((0.0..=1.0).contains(&stats.purity));
            assert_eq!(stats.continuity > 0, stats.dominant_partner.is_some());
        }
        assert!((0.0..=1.0).contains(&out.stats.overall.track_pd));

        for (g, cts) in &out.associations.gt_to_ct {
            for c in cts {
                assert!(out.associations.ct_to_gt[c].contains(g));
            }
        }
    }

    #[test]
    fn association_duals_are_symmetric() {
        let mut store = TrackStore::new();
        let g1 = steady_track(&mut store, 1, 0, 10, (0.0, 0.0), (1.0, 0.0), 10.0);
        let g2 = steady_track(&mut store, 2, 0, 10, (100.0, 0.0), (1.0, 0.0), 10.0);
        // c1 overlaps g1, c3 overlaps g2, c2 overlaps nothing
        let c1 = steady_track(&mut store, 3, 0, 10, (1.0, 1.0), (1.0, 0.0), 10.0);
        let c2 = steady_track(&mut store, 4, 0, 10, (500.0, 500.0), (1.0, 0.0), 10.0);
        let mut big = crate::store::builder::TrackBuilder::new(5);
        for i in 0..10u64 {
            big = big.frame(
                i,
                BoundingBox::new(99.0 + i as f64, 1.0, 10.0, 10.0),
            );
        }
        let c3 = store.add_track(big.build());

        let out = score_tracks(&mut store, &[g1, g2], &[c1, c2, c3], &MatchingParams::default())
            .unwrap();

        for (g, cts) in &out.associations.gt_to_ct {
            for c in cts {
                assert!(out.associations.ct_to_gt[c].contains(g));
            }
        }
        for (c, gts) in &out.associations.ct_to_gt {
            for g in gts {
                assert!(out.associations.gt_to_ct[g].contains(c));
            }
        }
        assert!(out.associations.ct_to_gt[&c2].is_empty());
    }
}
