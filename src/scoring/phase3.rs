use crate::scoring::phase2::Associations;
use crate::scoring::TrackPair;
use crate::store::{TrackHandle, TrackStore};
use crate::Errors;
use anyhow::Result;
use log::info;
use std::collections::BTreeMap;

/// Per-track phase-3 record.
///
#[derive(Clone, Debug, Default)]
pub struct TrackStats {
    /// Number of partner tracks associated with this track
    pub continuity: usize,
    /// Fraction of the track's in-AOI lifetime attributable to the dominant
    /// partner, clamped to [0, 1]
    pub purity: f64,
    /// Partner with the largest frames-on-target count
    pub dominant_partner: Option<TrackHandle>,
    /// The dominant partner's frames-on-target count
    pub dominant_frames: usize,
    /// The track's own frames-in-AOI lifetime
    pub lifetime_frames: usize,
}

/// Scalar aggregates over all tracks.
///
/// The computed-track averages run over tracks with a *nonzero* value of the
/// respective statistic, while the ground-truth averages divide by the full
/// ground-truth count unconditionally. The asymmetry reproduces the upstream
/// metric definition and is intentional; do not "fix" it silently.
///
#[derive(Clone, Debug, Default)]
pub struct OverallStats {
    pub avg_continuity_computed: f64,
    pub avg_purity_computed: f64,
    pub avg_continuity_gt: f64,
    pub avg_purity_gt: f64,
    /// Fraction of ground-truth tracks with at least one association
    pub track_pd: f64,
    /// Number of computed tracks with no association
    pub track_fa: f64,
}

/// Phase-3 output: per-track stat maps plus the overall record.
///
#[derive(Debug, Default)]
pub struct ScoreStats {
    pub gt_stats: BTreeMap<TrackHandle, TrackStats>,
    pub ct_stats: BTreeMap<TrackHandle, TrackStats>,
    pub overall: OverallStats,
}

/// Computes one track's stats from its association list. The dominant
/// partner is the one with the largest frames-on-target; the first partner
/// encountered keeps the title unless a later one is strictly greater, and
/// lists ascend by handle, so ties resolve to the lowest handle.
fn track_stats(
    track: TrackHandle,
    partners: &[TrackHandle],
    pair_of: impl Fn(TrackHandle) -> TrackPair,
    assoc: &Associations,
    store: &TrackStore,
) -> Result<TrackStats> {
    let lifetime_frames = store.get(track)?.frames_in_aoi();

    let mut dominant: Option<(TrackHandle, usize)> = None;
    for &partner in partners {
        let pair = pair_of(partner);
        let scalars = assoc
            .scalars
            .get(&pair)
            .ok_or(Errors::MissingScore(pair.gt, pair.ct))?;
        let frames = scalars.frames_on_target;
        dominant = match dominant {
            Some((_, best)) if frames <= best => dominant,
            _ => Some((partner, frames)),
        };
    }

    let (dominant_partner, dominant_frames) = match dominant {
        Some((partner, frames)) => (Some(partner), frames),
        None => (None, 0),
    };

    // division-by-zero policy: zero lifetime yields purity 0.0; overlap
    // double counting across aligned partners can push the ratio past 1.0,
    // hence the clamp
    let purity = if lifetime_frames == 0 {
        0.0
    } else {
        (dominant_frames as f64 / lifetime_frames as f64).min(1.0)
    };

    Ok(TrackStats {
        continuity: partners.len(),
        purity,
        dominant_partner,
        dominant_frames,
        lifetime_frames,
    })
}

/// Phase 3: final per-track and overall statistics from the phase-2
/// association maps.
///
pub fn aggregate(assoc: &Associations, store: &TrackStore) -> Result<ScoreStats> {
    let mut gt_stats = BTreeMap::new();
    for (&gt, partners) in &assoc.gt_to_ct {
        let stats = track_stats(gt, partners, |ct| TrackPair::new(gt, ct), assoc, store)?;
        gt_stats.insert(gt, stats);
    }

    let mut ct_stats = BTreeMap::new();
    for (&ct, partners) in &assoc.ct_to_gt {
        let stats = track_stats(ct, partners, |gt| TrackPair::new(gt, ct), assoc, store)?;
        ct_stats.insert(ct, stats);
    }

    let mut overall = OverallStats::default();

    // computed-track averages: only tracks with a nonzero value of the given
    // statistic enter its denominator
    let nonzero_continuity: Vec<usize> = ct_stats
        .values()
        .map(|s| s.continuity)
        .filter(|&c| c > 0)
        .collect();
    if !nonzero_continuity.is_empty() {
        overall.avg_continuity_computed =
            nonzero_continuity.iter().sum::<usize>() as f64 / nonzero_continuity.len() as f64;
    }
    let nonzero_purity: Vec<f64> = ct_stats
        .values()
        .map(|s| s.purity)
        .filter(|&p| p > 0.0)
        .collect();
    if !nonzero_purity.is_empty() {
        overall.avg_purity_computed =
            nonzero_purity.iter().sum::<f64>() / nonzero_purity.len() as f64;
    }

    // ground-truth averages: all tracks, divided by n_true_tracks
    if assoc.n_true_tracks > 0 {
        let n = assoc.n_true_tracks as f64;
        overall.avg_continuity_gt =
            gt_stats.values().map(|s| s.continuity as f64).sum::<f64>() / n;
        overall.avg_purity_gt = gt_stats.values().map(|s| s.purity).sum::<f64>() / n;

        let detected = gt_stats.values().filter(|s| s.continuity > 0).count();
        overall.track_pd = detected as f64 / n;
    }

    overall.track_fa = ct_stats.values().filter(|s| s.continuity == 0).count() as f64;

    info!(
        "Phase 3: trackPD={:.4} trackFA={} gt continuity/purity {:.4}/{:.4} ct {:.4}/{:.4}",
        overall.track_pd,
        overall.track_fa,
        overall.avg_continuity_gt,
        overall.avg_purity_gt,
        overall.avg_continuity_computed,
        overall.avg_purity_computed
    );

    Ok(ScoreStats {
        gt_stats,
        ct_stats,
        overall,
    })
}
