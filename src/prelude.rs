use crate::scoring;
use crate::store;
use crate::utils;

pub use scoring::matching::{MatchingParams, MinFrames, OverlapMode};
pub use scoring::phase1::{ScoreMatrix, Track2TrackScore};
pub use scoring::phase2::{Associations, Track2TrackScalars};
pub use scoring::phase3::{OverallStats, ScoreStats, TrackStats};
pub use scoring::{score_tracks, PairScore, ScoreOutput, TrackPair};
pub use store::builder::TrackBuilder;
pub use store::{Frame, FrameState, Track, TrackHandle, TrackStore};
pub use utils::aoi::Aoi;
pub use utils::bbox::{BoundingBox, EstimateClose};
