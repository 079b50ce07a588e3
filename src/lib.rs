/// Track storage collaborator: arena of tracks addressed by opaque handles
pub mod store;

/// Scoring pipeline: matching policy, phases 1-3
pub mod scoring;

/// Geometry and AOI utilities
pub mod utils;

/// Convenience re-exports
pub mod prelude;

#[cfg(test)]
pub mod test_stuff;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Errors {
    #[error("Radial overlap is mutually exclusive with spatial matching options.")]
    RadialAndSpatialExclusive,
    #[error("Ground-truth/computed percentage pair is mutually exclusive with the IoU threshold.")]
    PercentagePairAndIouExclusive,
    #[error("Minimum bound area is mutually exclusive with the IoU threshold and the percentage pair.")]
    MinAreaExclusive,
    #[error("Radial overlap is mutually exclusive with passing all nonzero overlaps.")]
    RadialAndNonzeroOverlapsExclusive,
    #[error("Percentage-pair matching requires a minimum-frames threshold to be set.")]
    PercentagePairRequiresMinFrames,
    #[error("Cannot parse option value `{0}`.")]
    ParseError(String),
    #[error("Missing track for handle {0}.")]
    MissingTrack(u64),
    #[error("Missing pair score for (gt={0}, ct={1}) - inconsistent phase output.")]
    MissingScore(u64, u64),
}

pub(crate) const EPS: f64 = 0.00001;
