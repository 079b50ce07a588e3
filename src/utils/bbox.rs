use crate::EPS;
use std::cmp::Ordering;

/// Bounding box in the format (x, y, width, height)
///
#[derive(Clone, Default, Debug, Copy)]
pub struct BoundingBox {
    _x: f64,
    _y: f64,
    _width: f64,
    _height: f64,
}

impl BoundingBox {
    /// Constructor
    ///
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            _x: x,
            _y: y,
            _width: width,
            _height: height,
        }
    }

    /// Constructor from two opposite corners
    ///
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            _x: x0.min(x1),
            _y: y0.min(y1),
            _width: (x1 - x0).abs(),
            _height: (y1 - y0).abs(),
        }
    }

    pub fn x(&self) -> f64 {
        self._x
    }

    pub fn y(&self) -> f64 {
        self._y
    }

    pub fn width(&self) -> f64 {
        self._width
    }

    pub fn height(&self) -> f64 {
        self._height
    }

    pub fn area(&self) -> f64 {
        self._width * self._height
    }

    pub fn center(&self) -> (f64, f64) {
        (self._x + self._width / 2.0, self._y + self._height / 2.0)
    }

    /// Grows the box by `margin` on every side. A negative margin shrinks the
    /// box; the result is clamped to zero extent rather than inverting.
    ///
    pub fn expand(&self, margin: f64) -> Self {
        let width = (self._width + 2.0 * margin).max(0.0);
        let height = (self._height + 2.0 * margin).max(0.0);
        Self {
            _x: self._x - margin,
            _y: self._y - margin,
            _width: width,
            _height: height,
        }
    }

    /// Builds a square box of side `size` centered at (x, y). Used when point
    /// detections participate in spatial matching.
    ///
    pub fn point_box(x: f64, y: f64, size: f64) -> Self {
        Self {
            _x: x - size / 2.0,
            _y: y - size / 2.0,
            _width: size,
            _height: size,
        }
    }

    pub fn intersection(l: &BoundingBox, r: &BoundingBox) -> f64 {
        let (ax0, ay0, ax1, ay1) = (l._x, l._y, l._x + l._width, l._y + l._height);
        let (bx0, by0, bx1, by1) = (r._x, r._y, r._x + r._width, r._y + r._height);

        let (x1, y1) = (ax0.max(bx0), ay0.max(by0));
        let (x2, y2) = (ax1.min(bx1), ay1.min(by1));

        let int_width = x2 - x1;
        let int_height = y2 - y1;

        if int_width > 0.0 && int_height > 0.0 {
            int_width * int_height
        } else {
            0.0
        }
    }

    /// Intersection over union. `None` when both boxes are degenerate and the
    /// union is empty.
    ///
    pub fn iou(l: &BoundingBox, r: &BoundingBox) -> Option<f64> {
        let intersection = BoundingBox::intersection(l, r);
        let union = l.area() + r.area() - intersection;
        if union <= 0.0 {
            None
        } else {
            Some(intersection / union)
        }
    }

    /// Euclidean distance between box centers. Radial matching treats boxes
    /// as point detections located at their centers.
    ///
    pub fn center_distance(l: &BoundingBox, r: &BoundingBox) -> f64 {
        let (lx, ly) = l.center();
        let (rx, ry) = r.center();
        let dx = lx - rx;
        let dy = ly - ry;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Allows comparing values approximately
///
pub trait EstimateClose {
    fn almost_same(&self, other: &Self, eps: f64) -> bool;
}

impl EstimateClose for BoundingBox {
    fn almost_same(&self, other: &Self, eps: f64) -> bool {
        (self._x - other._x).abs() < eps
            && (self._y - other._y).abs() < eps
            && (self._width - other._width).abs() < eps
            && (self._height - other._height).abs() < eps
    }
}

impl PartialEq<Self> for BoundingBox {
    fn eq(&self, other: &Self) -> bool {
        self.almost_same(other, EPS)
    }
}

impl PartialOrd for BoundingBox {
    fn partial_cmp(&self, _other: &Self) -> Option<Ordering> {
        unreachable!()
    }
}
