use crate::scoring::{PairScore, TrackPair};
use crate::store::TrackHandle;
use log::debug;
use std::collections::BTreeMap;

/// Per track-pair scalars derived from the phase-1 record.
///
/// Dominance is a local one-to-one test per pair: `computed_dominated_by_target`
/// holds when the ground-truth track is the *unique* association of the
/// computed track, and symmetrically for `target_dominated_by_computed`.
/// Many-to-many structures remain possible at the track level; phase 3 picks
/// one dominant partner per track.
///
#[derive(Clone, Debug, Default)]
pub struct Track2TrackScalars {
    /// Whether the computed track is associated with the target
    pub associated: bool,
    /// Frames the computed track overlaps the target
    pub frames_on_target: usize,
    pub computed_dominated_by_target: bool,
    pub target_dominated_by_computed: bool,
}

/// Phase-2 output: the two dual reduction maps plus per-pair scalars.
///
/// Every input track has an entry in its reduction map, associated or not.
/// Association lists ascend by partner handle (they are built by iterating
/// the ordered phase-1 matrix), which fixes the phase-3 tie-break order.
///
#[derive(Debug, Default)]
pub struct Associations {
    pub scalars: BTreeMap<TrackPair, Track2TrackScalars>,
    /// Ground-truth track -> associated computed tracks
    pub gt_to_ct: BTreeMap<TrackHandle, Vec<TrackHandle>>,
    /// Computed track -> associated ground-truth tracks
    pub ct_to_gt: BTreeMap<TrackHandle, Vec<TrackHandle>>,
    /// Size of the ground-truth collection at input time, associated or not
    pub n_true_tracks: usize,
    /// Size of the computed collection at input time
    pub n_computed_tracks: usize,
}

/// Phase 2: reduces the phase-1 matrix to per-track association lists and
/// per-pair dominance scalars. Generic over the score type so the same
/// reduction serves any per-pair record exposing [PairScore].
///
pub fn resolve<S: PairScore>(
    scores: &BTreeMap<TrackPair, S>,
    gt_handles: &[TrackHandle],
    ct_handles: &[TrackHandle],
) -> Associations {
    let mut assoc = Associations {
        n_true_tracks: gt_handles.len(),
        n_computed_tracks: ct_handles.len(),
        ..Associations::default()
    };

    for &gt in gt_handles {
        assoc.gt_to_ct.entry(gt).or_default();
    }
    for &ct in ct_handles {
        assoc.ct_to_gt.entry(ct).or_default();
    }

    for (pair, score) in scores {
        if score.is_match() {
            assoc.gt_to_ct.entry(pair.gt).or_default().push(pair.ct);
            assoc.ct_to_gt.entry(pair.ct).or_default().push(pair.gt);
        }
    }

    for (pair, score) in scores {
        let associated = score.is_match();
        let sole_gt_of_ct = assoc
            .ct_to_gt
            .get(&pair.ct)
            .map_or(false, |gts| gts.len() == 1);
        let sole_ct_of_gt = assoc
            .gt_to_ct
            .get(&pair.gt)
            .map_or(false, |cts| cts.len() == 1);
        assoc.scalars.insert(
            *pair,
            Track2TrackScalars {
                associated,
                frames_on_target: score.frames_on_target(),
                computed_dominated_by_target: associated && sole_gt_of_ct,
                target_dominated_by_computed: associated && sole_ct_of_gt,
            },
        );
    }

    debug!(
        "Phase 2: {} pairs reduced over {} true / {} computed tracks",
        assoc.scalars.len(),
        assoc.n_true_tracks,
        assoc.n_computed_tracks
    );

    assoc
}

#[cfg(test)]
mod phase2_tests {
    use crate::scoring::phase2::resolve;
    use crate::scoring::{PairScore, TrackPair};
    use std::collections::BTreeMap;

    struct FakeScore {
        matched: bool,
        frames: usize,
    }

    impl PairScore for FakeScore {
        fn is_match(&self) -> bool {
            self.matched
        }

        fn frames_on_target(&self) -> usize {
            self.frames
        }
    }

    fn matrix(entries: &[(u64, u64, bool, usize)]) -> BTreeMap<TrackPair, FakeScore> {
        entries
            .iter()
            .map(|&(gt, ct, matched, frames)| {
                (TrackPair::new(gt, ct), FakeScore { matched, frames })
            })
            .collect()
    }

    #[test]
    fn one_to_one_pair_is_doubly_dominant() {
        let scores = matrix(&[(0, 1, true, 7)]);
        let assoc = resolve(&scores, &[0], &[1]);

        let s = &assoc.scalars[&TrackPair::new(0, 1)];
        assert!(s.associated);
        assert_eq!(s.frames_on_target, 7);
        assert!(s.computed_dominated_by_target);
        assert!(s.target_dominated_by_computed);
    }

    #[test]
    fn fragmented_target_dominates_its_fragments() {
        // one GT track picked up by two computed fragments
        let scores = matrix(&[(0, 1, true, 4), (0, 2, true, 6)]);
        let assoc = resolve(&scores, &[0], &[1, 2]);

        assert_eq!(assoc.gt_to_ct[&0], vec![1, 2]);
        for ct in [1, 2] {
            let s = &assoc.scalars[&TrackPair::new(0, ct)];
            // each fragment has the GT as its sole association
            assert!(s.computed_dominated_by_target);
            // the GT has two associations, so no fragment dominates it
            assert!(!s.target_dominated_by_computed);
        }
    }

    #[test]
    fn unassociated_tracks_keep_empty_lists() {
        let scores = matrix(&[(0, 10, true, 3)]);
        let assoc = resolve(&scores, &[0, 1], &[10, 11]);

        assert_eq!(assoc.gt_to_ct.len(), 2);
        assert!(assoc.gt_to_ct[&1].is_empty());
        assert!(assoc.ct_to_gt[&11].is_empty());
        assert_eq!(assoc.n_true_tracks, 2);
        assert_eq!(assoc.n_computed_tracks, 2);
    }

    #[test]
    fn nonmatching_retained_pairs_do_not_associate() {
        // pass-all-nonzero-overlaps can leave non-matching records in the matrix
        let scores = matrix(&[(0, 1, false, 2)]);
        let assoc = resolve(&scores, &[0], &[1]);

        assert!(assoc.gt_to_ct[&0].is_empty());
        let s = &assoc.scalars[&TrackPair::new(0, 1)];
        assert!(!s.associated);
        assert_eq!(s.frames_on_target, 2);
        assert!(!s.computed_dominated_by_target);
        assert!(!s.target_dominated_by_computed);
    }

    #[test]
    fn association_lists_ascend_by_handle() {
        let scores = matrix(&[(0, 5, true, 1), (0, 2, true, 1), (0, 9, true, 1)]);
        let assoc = resolve(&scores, &[0], &[2, 5, 9]);
        assert_eq!(assoc.gt_to_ct[&0], vec![2, 5, 9]);
    }
}
