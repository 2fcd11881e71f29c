//! Region types on the unit sphere and the pairwise `contains` /
//! `intersects` matrix between them.
//!
//! Each concrete region answers the predicates it can decide itself; the
//! closed [`Region`] enum routes every pair to one implementation, so
//! `a.intersects(b)` and `b.intersects(a)` always run the same code.

pub(crate) mod arc;
pub mod circle;
pub mod ellipse;
pub mod polygon;
pub mod spherical_box;

use serde::{Deserialize, Serialize};

pub use circle::SphericalCircle;
pub use ellipse::SphericalEllipse;
pub use polygon::SphericalConvexPolygon;
pub use spherical_box::SphericalBox;

use crate::coords::Coords;

/// Behaviour shared by every region kind.
pub trait SphericalRegion {
    /// A box containing every point of the region.
    fn bounding_box(&self) -> SphericalBox;

    /// A circle containing every point of the region.
    fn bounding_circle(&self) -> SphericalCircle;

    /// Whether the region contains the given position.
    fn contains_point(&self, point: impl Into<Coords>) -> bool;
}

/// Any one of the four region kinds.
///
/// Pairs that have no exact test are answered conservatively: `intersects`
/// may report `true` for regions that only nearly touch, and `contains` may
/// report `false` for regions that are barely inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Region {
    Box(SphericalBox),
    Circle(SphericalCircle),
    Ellipse(SphericalEllipse),
    Polygon(SphericalConvexPolygon),
}

impl Region {
    /// Whether every point of `other` lies in `self`.
    pub fn contains(&self, other: &Region) -> bool {
        use Region::*;
        match (self, other) {
            (Box(a), Box(b)) => a.contains_box(b),
            (Box(a), Circle(b)) => a.contains_circle(b),
            (Box(a), Ellipse(b)) => a.contains_ellipse(b),
            (Box(a), Polygon(b)) => a.contains_polygon(b),

            (Circle(a), Box(b)) => a.contains_box(b),
            (Circle(a), Circle(b)) => a.contains_circle(b),
            (Circle(a), Ellipse(b)) => a.contains_ellipse(b),
            (Circle(a), Polygon(b)) => a.contains_polygon(b),

            (Ellipse(a), Box(b)) => a.contains_box(b),
            (Ellipse(a), Circle(b)) => a.contains_circle(b),
            (Ellipse(a), Ellipse(b)) => a.contains_ellipse(b),
            (Ellipse(a), Polygon(b)) => a.contains_polygon(b),

            (Polygon(a), Box(b)) => a.contains_box(b),
            (Polygon(a), Circle(b)) => a.contains_circle(b),
            (Polygon(a), Ellipse(b)) => a.contains_ellipse(b),
            (Polygon(a), Polygon(b)) => a.contains_polygon(b),
        }
    }

    /// Whether `self` and `other` share at least one point.
    pub fn intersects(&self, other: &Region) -> bool {
        use Region::*;
        match (self, other) {
            (Box(a), Box(b)) => a.intersects_box(b),
            (Circle(a), Circle(b)) => a.intersects_circle(b),
            (Ellipse(a), Ellipse(b)) => a.intersects_ellipse(b),
            (Polygon(a), Polygon(b)) => a.intersects_polygon(b),

            (Box(a), Circle(c)) | (Circle(c), Box(a)) => a.intersects_circle(c),
            (Box(a), Ellipse(e)) | (Ellipse(e), Box(a)) => a.intersects_ellipse(e),
            (Box(a), Polygon(p)) | (Polygon(p), Box(a)) => p.intersects_box(a),
            (Circle(c), Ellipse(e)) | (Ellipse(e), Circle(c)) => e.intersects_circle(c),
            (Circle(c), Polygon(p)) | (Polygon(p), Circle(c)) => p.intersects_circle(c),
            (Ellipse(e), Polygon(p)) | (Polygon(p), Ellipse(e)) => p.intersects_ellipse(e),
        }
    }
}

impl SphericalRegion for Region {
    fn bounding_box(&self) -> SphericalBox {
        match self {
            Region::Box(r) => r.bounding_box(),
            Region::Circle(r) => r.bounding_box(),
            Region::Ellipse(r) => r.bounding_box(),
            Region::Polygon(r) => r.bounding_box(),
        }
    }

    fn bounding_circle(&self) -> SphericalCircle {
        match self {
            Region::Box(r) => r.bounding_circle(),
            Region::Circle(r) => r.bounding_circle(),
            Region::Ellipse(r) => r.bounding_circle(),
            Region::Polygon(r) => r.bounding_circle(),
        }
    }

    fn contains_point(&self, point: impl Into<Coords>) -> bool {
        match self {
            Region::Box(r) => r.contains_point(point),
            Region::Circle(r) => r.contains_point(point),
            Region::Ellipse(r) => r.contains_point(point),
            Region::Polygon(r) => r.contains_point(point),
        }
    }
}

impl From<SphericalBox> for Region {
    fn from(r: SphericalBox) -> Self {
        Region::Box(r)
    }
}

impl From<SphericalCircle> for Region {
    fn from(r: SphericalCircle) -> Self {
        Region::Circle(r)
    }
}

impl From<SphericalEllipse> for Region {
    fn from(r: SphericalEllipse) -> Self {
        Region::Ellipse(r)
    }
}

impl From<SphericalConvexPolygon> for Region {
    fn from(r: SphericalConvexPolygon) -> Self {
        Region::Polygon(r)
    }
}
