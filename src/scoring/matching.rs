use crate::utils::aoi::Aoi;
use crate::Errors;
use anyhow::Result;
use log::error;

/// Default temporal alignment tolerance between ground-truth and computed
/// frames, in seconds.
pub const DEFAULT_FRAME_ALIGNMENT_SECS: f64 = 0.5;

/// Minimum-frames policy deciding when a pair's accumulated overlapping-frame
/// count qualifies as a track match. The boundary is inclusive.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MinFrames {
    /// Absolute overlapping-frame count; 0 disables the threshold
    Absolute(usize),
    /// Fraction of the ground-truth track length, in [0, 1]
    PercentOfGroundTruth(f64),
}

impl Default for MinFrames {
    fn default() -> Self {
        MinFrames::Absolute(0)
    }
}

impl MinFrames {
    pub fn is_disabled(&self) -> bool {
        matches!(self, MinFrames::Absolute(0))
    }

    /// Whether `overlapping` frames out of a ground-truth track of
    /// `gt_frames` frames satisfy the threshold. A pair with zero overlapping
    /// frames never matches, regardless of policy.
    pub fn satisfied(&self, overlapping: usize, gt_frames: usize) -> bool {
        if overlapping == 0 {
            return false;
        }
        match *self {
            MinFrames::Absolute(n) => overlapping >= n,
            MinFrames::PercentOfGroundTruth(p) => overlapping as f64 >= p * gt_frames as f64,
        }
    }
}

/// Frame-overlap test mode derived from a validated [MatchingParams]. The
/// modes are mutually exclusive by construction.
///
#[derive(Clone, Copy, Debug)]
pub enum OverlapMode {
    /// Euclidean center distance at most the given radius
    Radial(f64),
    /// Intersection over union at least the given threshold
    Iou(f64),
    /// Raw intersection area at least the given minimum
    MinArea(f64),
    /// Per-side percentage-of-box-overlapped test; 0 means "don't care"
    /// for that side
    Percentage(f64, f64),
    /// Any positive intersection counts
    AnyPositive,
}

/// Matching policy: all threshold and mode choices of one scoring run.
/// Immutable once validated by [MatchingParams::sanity_check].
///
#[derive(Clone, Debug)]
pub struct MatchingParams {
    /// Temporal alignment tolerance between GT and CT frames, seconds
    pub frame_alignment_secs: f64,
    /// Distance by which every box is grown before the spatial test
    pub bbox_expansion: Option<f64>,
    /// Area of interest; frames outside it are excluded from scoring
    pub aoi: Aoi,
    /// Minimum intersection area for a frame overlap; 0 disables
    pub min_bound_area: f64,
    /// Track-level minimum-frames policy
    pub min_frames: MinFrames,
    /// (ground-truth, computed) percentage-of-box thresholds
    pub min_pcent_gt_ct: Option<(f64, f64)>,
    /// IoU threshold
    pub iou: Option<f64>,
    /// Radial overlap distance; exclusive with all spatial options
    pub radial_overlap: Option<f64>,
    /// Side of the square a point detection is expanded to in radial mode;
    /// 0 keeps detections as pure points
    pub point_detection_box_size: f64,
    /// Keep pairs with any nonzero overlap even when the match test fails
    pub pass_all_nonzero_overlaps: bool,
}

impl Default for MatchingParams {
    fn default() -> Self {
        Self {
            frame_alignment_secs: DEFAULT_FRAME_ALIGNMENT_SECS,
            bbox_expansion: None,
            aoi: Aoi::default(),
            min_bound_area: 0.0,
            min_frames: MinFrames::default(),
            min_pcent_gt_ct: None,
            iou: None,
            radial_overlap: None,
            point_detection_box_size: 0.0,
            pass_all_nonzero_overlaps: false,
        }
    }
}

impl MatchingParams {
    pub fn with_frame_alignment(mut self, secs: f64) -> Self {
        self.frame_alignment_secs = secs;
        self
    }

    pub fn with_bbox_expansion(mut self, distance: f64) -> Self {
        self.bbox_expansion = Some(distance);
        self
    }

    pub fn with_aoi(mut self, aoi: Aoi) -> Self {
        self.aoi = aoi;
        self
    }

    pub fn with_min_bound_area(mut self, area: f64) -> Self {
        self.min_bound_area = area;
        self
    }

    pub fn with_min_frames(mut self, min_frames: MinFrames) -> Self {
        self.min_frames = min_frames;
        self
    }

    pub fn with_min_pcent_gt_ct(mut self, gt_pcent: f64, ct_pcent: f64) -> Self {
        self.min_pcent_gt_ct = Some((gt_pcent, ct_pcent));
        self
    }

    /// Parses the `GT_PCENT:CT_PCENT` textual form of the percentage pair
    ///
    pub fn with_min_pcent_gt_ct_str(mut self, spec: &str) -> Result<Self> {
        let (gt_pcent, ct_pcent) = parse_percentage_pair(spec)?;
        self.min_pcent_gt_ct = Some((gt_pcent, ct_pcent));
        Ok(self)
    }

    pub fn with_iou(mut self, threshold: f64) -> Self {
        self.iou = Some(threshold);
        self
    }

    pub fn with_radial_overlap(mut self, distance: f64) -> Self {
        self.radial_overlap = Some(distance);
        self
    }

    pub fn with_point_detection_box_size(mut self, size: f64) -> Self {
        self.point_detection_box_size = size;
        self
    }

    pub fn with_pass_all_nonzero_overlaps(mut self, pass: bool) -> Self {
        self.pass_all_nonzero_overlaps = pass;
        self
    }

    /// Rejects contradictory option combinations before any scoring runs.
    /// Failures are reported at ERROR and abort the run.
    ///
    pub fn sanity_check(&self) -> Result<()> {
        if self.radial_overlap.is_some() {
            let spatial_options_set = self.bbox_expansion.is_some()
                || self.min_bound_area > 0.0
                || self.min_pcent_gt_ct.is_some()
                || self.iou.is_some();
            if spatial_options_set {
                error!("Radial overlap cannot be combined with spatial matching options");
                return Err(Errors::RadialAndSpatialExclusive.into());
            }
            if self.pass_all_nonzero_overlaps {
                error!("Radial overlap cannot be combined with pass-all-nonzero-overlaps");
                return Err(Errors::RadialAndNonzeroOverlapsExclusive.into());
            }
        }

        if self.min_pcent_gt_ct.is_some() && self.iou.is_some() {
            error!("Percentage pair and IoU threshold cannot both be set");
            return Err(Errors::PercentagePairAndIouExclusive.into());
        }

        if self.min_bound_area > 0.0 && (self.iou.is_some() || self.min_pcent_gt_ct.is_some()) {
            error!("Minimum bound area cannot be combined with IoU or the percentage pair");
            return Err(Errors::MinAreaExclusive.into());
        }

        if self.min_pcent_gt_ct.is_some() && self.min_frames.is_disabled() {
            error!("Percentage-pair matching requires the minimum-frames option");
            return Err(Errors::PercentagePairRequiresMinFrames.into());
        }

        Ok(())
    }

    /// The single overlap-test mode this policy selects. Call after
    /// [sanity_check](MatchingParams::sanity_check).
    ///
    pub fn overlap_mode(&self) -> OverlapMode {
        if let Some(radius) = self.radial_overlap {
            OverlapMode::Radial(radius)
        } else if let Some(threshold) = self.iou {
            OverlapMode::Iou(threshold)
        } else if let Some((gt_pcent, ct_pcent)) = self.min_pcent_gt_ct {
            OverlapMode::Percentage(gt_pcent, ct_pcent)
        } else if self.min_bound_area > 0.0 {
            OverlapMode::MinArea(self.min_bound_area)
        } else {
            OverlapMode::AnyPositive
        }
    }
}

/// Parses a `GT_PCENT:CT_PCENT` pair, e.g. `0.5:0.25`
///
pub fn parse_percentage_pair(spec: &str) -> Result<(f64, f64)> {
    let parse = |t: &str| {
        t.trim()
            .parse::<f64>()
            .map_err(|_| Errors::ParseError(t.to_string()))
    };
    match spec.split_once(':') {
        Some((gt_part, ct_part)) => Ok((
            parse(gt_part).map_err(|e| {
                error!("Malformed percentage pair `{}`", spec);
                e
            })?,
            parse(ct_part).map_err(|e| {
                error!("Malformed percentage pair `{}`", spec);
                e
            })?,
        )),
        None => {
            error!("Malformed percentage pair `{}`", spec);
            Err(Errors::ParseError(spec.to_string()).into())
        }
    }
}
