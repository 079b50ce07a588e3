/// Bounding boxes
pub mod bbox;

/// Area-of-interest descriptors
pub mod aoi;
