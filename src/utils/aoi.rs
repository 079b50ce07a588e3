use crate::utils::bbox::BoundingBox;
use crate::Errors;
use anyhow::Result;
use geo::{Contains, Coordinate, LineString, Point, Polygon};
use log::error;

/// Area of interest. Frames whose detection falls outside the AOI are
/// excluded from overlap scoring and do not count toward track lifetimes.
///
/// The containment test uses the bounding-box centroid, so pixel and
/// geographic variants behave uniformly. Geographic AOIs assume the track
/// boxes carry lon-lat world coordinates.
///
#[derive(Clone, Debug, Default)]
pub enum Aoi {
    /// No AOI configured, every frame is inside
    #[default]
    Unbounded,
    /// Rectangular AOI in image pixel coordinates
    PixelBox(BoundingBox),
    /// Polygonal AOI in lon-lat coordinates (2-corner rectangle or 4-corner quad)
    Geographic(Polygon<f64>),
}

impl Aoi {
    pub fn pixel_box(bbox: BoundingBox) -> Self {
        Aoi::PixelBox(bbox)
    }

    /// Builds a geographic AOI from lon-lat corners: two opposite corners for
    /// an axis-aligned rectangle, or four corners for an arbitrary quad.
    ///
    pub fn geo_corners(corners: &[(f64, f64)]) -> Result<Self> {
        let ring: Vec<Coordinate<f64>> = match corners.len() {
            2 => {
                let (x0, y0) = corners[0];
                let (x1, y1) = corners[1];
                let (xmin, xmax) = (x0.min(x1), x0.max(x1));
                let (ymin, ymax) = (y0.min(y1), y0.max(y1));
                vec![
                    Coordinate { x: xmin, y: ymin },
                    Coordinate { x: xmax, y: ymin },
                    Coordinate { x: xmax, y: ymax },
                    Coordinate { x: xmin, y: ymax },
                ]
            }
            4 => corners
                .iter()
                .map(|&(x, y)| Coordinate { x, y })
                .collect(),
            n => {
                error!("Geographic AOI requires 2 or 4 corners, got {}", n);
                return Err(Errors::ParseError(format!("{} corners", n)).into());
            }
        };
        Ok(Aoi::Geographic(Polygon::new(LineString(ring), vec![])))
    }

    /// Parses the textual AOI option:
    /// * `pixel X0 Y0 X1 Y1` - pixel-coordinate rectangle;
    /// * `geo LON0 LAT0 LON1 LAT1` - 2-corner geographic rectangle;
    /// * `geo LON0 LAT0 ... LON3 LAT3` - 4-corner geographic quad.
    ///
    pub fn parse(spec: &str) -> Result<Self> {
        let mut tokens = spec.split_whitespace();
        let kind = tokens.next().unwrap_or("");
        let values = tokens
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|_| Errors::ParseError(t.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                error!("Malformed AOI specification `{}`", spec);
                e
            })?;

        match (kind, values.len()) {
            ("pixel", 4) => Ok(Aoi::PixelBox(BoundingBox::from_corners(
                values[0], values[1], values[2], values[3],
            ))),
            ("geo", 4) | ("geo", 8) => {
                let corners: Vec<(f64, f64)> =
                    values.chunks(2).map(|c| (c[0], c[1])).collect();
                Aoi::geo_corners(&corners)
            }
            _ => {
                error!("Malformed AOI specification `{}`", spec);
                Err(Errors::ParseError(spec.to_string()).into())
            }
        }
    }

    /// Whether the box centroid lies inside the AOI. Boundary is inclusive
    /// for the pixel variant.
    ///
    pub fn contains(&self, bbox: &BoundingBox) -> bool {
        let (cx, cy) = bbox.center();
        match self {
            Aoi::Unbounded => true,
            Aoi::PixelBox(aoi) => {
                cx >= aoi.x()
                    && cx <= aoi.x() + aoi.width()
                    && cy >= aoi.y()
                    && cy <= aoi.y() + aoi.height()
            }
            Aoi::Geographic(polygon) => polygon.contains(&Point::new(cx, cy)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Aoi::Unbounded)
    }
}
