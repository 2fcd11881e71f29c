use serde::{Deserialize, Serialize};

use super::arc;
use super::circle::SphericalCircle;
use super::ellipse::SphericalEllipse;
use super::polygon::SphericalConvexPolygon;
use super::SphericalRegion;
use crate::constants::ANGLE_EPSILON;
use crate::coords::{Coords, cartesian_angular_sep, cartesian_unit_vector, clamp_phi, reduce_lon, spherical_angular_sep, spherical_coords};
use crate::error::{GeometryError, Result};
use crate::vector::Vector;

/// Plane normals with a smaller `|z|` belong to meridian great circles.
const MERIDIAN_NZ: f64 = 1e-12;

/// A longitude/latitude rectangle.
///
/// Longitudes are stored canonically: `lon_min` in `[0, 360)` and
/// `lon_max` in `[lon_min, lon_min + 360]`, so a box crossing the prime
/// meridian has `lon_max > 360`. Two boxes that differ only by a 360 degree
/// longitude shift therefore compare equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SphericalBox {
    lon_min: f64,
    lon_max: f64,
    lat_min: f64,
    lat_max: f64,
}

impl PartialEq for SphericalBox {
    fn eq(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.is_empty() && other.is_empty();
        }
        self.lon_min == other.lon_min
            && self.lon_max == other.lon_max
            && self.lat_min == other.lat_min
            && self.lat_max == other.lat_max
    }
}

impl Default for SphericalBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl SphericalBox {
    /// Box with corners `min = (lon, lat)` and `max = (lon, lat)`.
    ///
    /// Latitudes are clamped to `[-90, 90]` and must not be reversed. A
    /// longitude range of 360 degrees or more yields a full-longitude box.
    /// `max.lon < min.lon` is accepted as a range wrapping through 0 only
    /// when both lie in `[0, 360]`; otherwise the bounds cross in the wrong
    /// direction and construction fails.
    pub fn new(min: impl Into<Coords>, max: impl Into<Coords>) -> Result<Self> {
        let (lon0, lat0) = spherical_coords(min);
        let (lon1, lat1) = spherical_coords(max);
        if !(lon0.is_finite() && lon1.is_finite() && lat0.is_finite() && lat1.is_finite()) {
            return Err(GeometryError::invalid("box bounds must be finite"));
        }
        let (lat0, lat1) = (clamp_phi(lat0), clamp_phi(lat1));
        if lat0 > lat1 {
            return Err(GeometryError::invalid(format!(
                "box latitude min {lat0} exceeds max {lat1}"
            )));
        }
        let span = if lon1 >= lon0 {
            lon1 - lon0
        } else if (0.0..=360.0).contains(&lon0) && (0.0..=360.0).contains(&lon1) {
            lon1 + 360.0 - lon0
        } else {
            return Err(GeometryError::invalid(format!(
                "box longitude bounds [{lon0}, {lon1}] cross in the wrong direction"
            )));
        };
        Ok(Self::from_raw(lon0, lon0 + span, lat0, lat1))
    }

    /// Box from already-ordered, finite bounds (`lon_min <= lon_max`,
    /// `lat_min <= lat_max`), canonicalizing the longitudes. Latitudes are
    /// clamped; a longitude span of 360 or more gives a full-longitude box.
    pub fn from_raw(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        let (lat_min, lat_max) = (clamp_phi(lat_min), clamp_phi(lat_max));
        let span = lon_max - lon_min;
        if span >= 360.0 {
            return Self {
                lon_min: 0.0,
                lon_max: 360.0,
                lat_min,
                lat_max,
            };
        }
        let lon_min = reduce_lon(lon_min);
        Self {
            lon_min,
            lon_max: lon_min + span.max(0.0),
            lat_min,
            lat_max,
        }
    }

    /// The box containing no points.
    pub fn empty() -> Self {
        Self {
            lon_min: 0.0,
            lon_max: 0.0,
            lat_min: 90.0,
            lat_max: -90.0,
        }
    }

    /// The box covering the whole sphere.
    pub fn full() -> Self {
        Self {
            lon_min: 0.0,
            lon_max: 360.0,
            lat_min: -90.0,
            lat_max: 90.0,
        }
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    /// Lower corner `(lon, lat)`.
    pub fn min(&self) -> (f64, f64) {
        (self.lon_min, self.lat_min)
    }

    /// Upper corner `(lon, lat)`; `lon` exceeds 360 for wrapping boxes.
    pub fn max(&self) -> (f64, f64) {
        (self.lon_max, self.lat_max)
    }

    pub fn is_empty(&self) -> bool {
        self.lat_min > self.lat_max
    }

    pub fn is_full(&self) -> bool {
        self.is_full_lon() && self.lat_min <= -90.0 && self.lat_max >= 90.0
    }

    pub fn is_full_lon(&self) -> bool {
        !self.is_empty() && self.lon_max - self.lon_min >= 360.0
    }

    /// Whether the longitude range crosses the prime meridian.
    pub fn wraps(&self) -> bool {
        !self.is_full_lon() && self.lon_max > 360.0
    }

    /// Longitude extent in degrees.
    pub fn width(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.lon_max - self.lon_min }
    }

    /// `(lon, lat)` of the box centre, or `None` for the empty box.
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        Some((
            reduce_lon(0.5 * (self.lon_min + self.lon_max)),
            0.5 * (self.lat_min + self.lat_max),
        ))
    }

    /// Solid angle in steradians.
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.width().to_radians() * (self.lat_max.to_radians().sin() - self.lat_min.to_radians().sin())
    }

    pub fn set_empty(&mut self) -> &mut Self {
        *self = Self::empty();
        self
    }

    pub fn set_full(&mut self) -> &mut Self {
        *self = Self::full();
        self
    }

    /// Whether longitude `lon` (any real) falls in the longitude range.
    pub(crate) fn lon_in_range(&self, lon: f64) -> bool {
        if self.is_full_lon() {
            return true;
        }
        let l = reduce_lon(lon);
        (self.lon_min <= l && l <= self.lon_max) || (self.lon_min <= l + 360.0 && l + 360.0 <= self.lon_max)
    }

    fn lat_in_range(&self, lat: f64) -> bool {
        self.lat_min <= lat && lat <= self.lat_max
    }

    /// Whether the box contains the point `(lon, lat)`. A pole belongs to
    /// every box whose latitude range reaches it.
    pub fn contains_lon_lat(&self, lon: f64, lat: f64) -> bool {
        if self.is_empty() || !self.lat_in_range(lat) {
            return false;
        }
        if lat.abs() >= 90.0 {
            return true;
        }
        self.lon_in_range(lon)
    }

    /// Corner points used as boundary samples. Full-longitude boxes have no
    /// meridian edges, so one point per bounding parallel stands in.
    pub(crate) fn corners(&self) -> Vec<Vector> {
        let lons = if self.is_full_lon() {
            vec![self.lon_min]
        } else {
            vec![self.lon_min, self.lon_max]
        };
        let mut out = Vec::with_capacity(4);
        for lon in lons {
            out.push(cartesian_unit_vector((lon, self.lat_min)));
            out.push(cartesian_unit_vector((lon, self.lat_max)));
        }
        out
    }

    // ── Box / box ───────────────────────────────────────────────────────────

    pub fn contains_box(&self, other: &SphericalBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if other.lat_min < self.lat_min || other.lat_max > self.lat_max {
            return false;
        }
        if self.is_full_lon() || (other.lat_min == other.lat_max && other.lat_min.abs() >= 90.0) {
            return true;
        }
        if other.is_full_lon() {
            return false;
        }
        [-360.0, 0.0, 360.0]
            .iter()
            .any(|k| other.lon_min + k >= self.lon_min && other.lon_max + k <= self.lon_max)
    }

    pub fn intersects_box(&self, other: &SphericalBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let lat_lo = self.lat_min.max(other.lat_min);
        let lat_hi = self.lat_max.min(other.lat_max);
        if lat_lo > lat_hi {
            return false;
        }
        // Boxes that both reach a pole share it.
        if self.is_full_lon() || other.is_full_lon() || lat_hi >= 90.0 || lat_lo <= -90.0 {
            return true;
        }
        [-360.0, 0.0, 360.0]
            .iter()
            .any(|k| other.lon_min + k <= self.lon_max && other.lon_max + k >= self.lon_min)
    }

    /// Shrink to the intersection with `other`, in place.
    ///
    /// Disjoint boxes produce the empty box. Boxes that only touch produce a
    /// zero-width box on the shared boundary. When the longitude ranges
    /// overlap in two separate pieces, the result is the tighter of the two
    /// ranges covering both pieces.
    pub fn shrink(&mut self, other: &SphericalBox) -> &mut Self {
        if self.is_empty() || other.is_empty() {
            return self.set_empty();
        }
        let lat_min = self.lat_min.max(other.lat_min);
        let lat_max = self.lat_max.min(other.lat_max);
        if lat_min > lat_max {
            return self.set_empty();
        }
        if lat_min == lat_max && lat_min.abs() >= 90.0 {
            // Both boxes reach the same pole, which has every longitude.
            *self = Self::from_raw(self.lon_min, self.lon_min, lat_min, lat_max);
            return self;
        }
        let (lon_min, lon_max) = if other.is_full_lon() {
            (self.lon_min, self.lon_max)
        } else if self.is_full_lon() {
            (other.lon_min, other.lon_max)
        } else {
            let pieces: Vec<(f64, f64)> = [-360.0, 0.0, 360.0]
                .iter()
                .map(|k| (self.lon_min.max(other.lon_min + k), self.lon_max.min(other.lon_max + k)))
                .filter(|(lo, hi)| lo <= hi)
                .collect();
            match pieces.as_slice() {
                [] if lat_max >= 90.0 || lat_min <= -90.0 => {
                    // Only the shared pole (or both poles) remains.
                    let lat_lo = if lat_min <= -90.0 { -90.0 } else { 90.0 };
                    let lat_hi = if lat_max >= 90.0 { 90.0 } else { -90.0 };
                    *self = Self::from_raw(self.lon_min, self.lon_min, lat_lo, lat_hi);
                    return self;
                }
                [] => return self.set_empty(),
                [only] => *only,
                [first, rest @ ..] => rest.iter().fold(*first, |acc, p| lon_hull(acc, *p)),
            }
        };
        *self = Self::from_raw(lon_min, lon_max, lat_min, lat_max);
        self
    }

    /// Grow to the bounding box of the union with `other`, in place, choosing
    /// the shorter of the possible longitude unions.
    pub fn extend(&mut self, other: &SphericalBox) -> &mut Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            *self = *other;
            return self;
        }
        let lat_min = self.lat_min.min(other.lat_min);
        let lat_max = self.lat_max.max(other.lat_max);
        let (lon_min, lon_max) = if self.is_full_lon() || other.is_full_lon() {
            (0.0, 360.0)
        } else {
            lon_hull((self.lon_min, self.lon_max), (other.lon_min, other.lon_max))
        };
        *self = Self::from_raw(lon_min, lon_max, lat_min, lat_max);
        self
    }

    /// Grow to include a single point, in place.
    pub fn extend_point(&mut self, point: impl Into<Coords>) -> &mut Self {
        let (lon, lat) = spherical_coords(point);
        let lat = clamp_phi(lat);
        if !self.is_empty() && lat.abs() >= 90.0 {
            // A pole has every longitude.
            self.lat_min = self.lat_min.min(lat);
            self.lat_max = self.lat_max.max(lat);
            return self;
        }
        self.extend(&Self::from_raw(lon, lon, lat, lat))
    }

    /// Tightest box around the great-circle arc from `v1` to `v2` running
    /// counter-clockwise about the plane normal `n`.
    ///
    /// The arc can bulge poleward of both endpoints, so the latitude range is
    /// widened to the great circle's extreme latitude when that point lies on
    /// the arc.
    pub fn edge(v1: &Vector, v2: &Vector, n: &Vector) -> SphericalBox {
        let (lon1, lat1) = spherical_coords(*v1);
        let (lon2, lat2) = spherical_coords(*v2);
        let mut lat_min = lat1.min(lat2);
        let mut lat_max = lat1.max(lat2);

        let north = Vector::Z - *n * n.z;
        if let Ok(top) = north.normalize() {
            if arc::on_arc(v1, v2, n, &top) {
                lat_max = clamp_phi(spherical_coords(top).1 + ANGLE_EPSILON);
            }
            if arc::on_arc(v1, v2, n, &-top) {
                lat_min = clamp_phi(spherical_coords(-top).1 - ANGLE_EPSILON);
            }
        }

        let at_pole = |v: &Vector| v.x == 0.0 && v.y == 0.0;
        let (lon_min, lon_max) = if n.z > MERIDIAN_NZ {
            (lon1, if lon2 < lon1 { lon2 + 360.0 } else { lon2 })
        } else if n.z < -MERIDIAN_NZ {
            (lon2, if lon1 < lon2 { lon1 + 360.0 } else { lon1 })
        } else {
            // Meridian circle: longitude is constant except across a pole.
            let lons: Vec<f64> = [(v1, lon1), (v2, lon2)]
                .iter()
                .filter(|(v, _)| !at_pole(v))
                .map(|(_, lon)| *lon)
                .collect();
            match lons.as_slice() {
                [a, b] if (a - b).abs() > 1e-9 => {
                    let (lo, hi) = (a.min(*b), a.max(*b));
                    if hi - lo <= 180.0 { (lo, hi) } else { (hi, lo + 360.0) }
                }
                [a, ..] => (*a, *a),
                [] => (0.0, 360.0),
            }
        };
        Self::from_raw(lon_min, lon_max, lat_min, lat_max)
    }

    // ── Distances ──────────────────────────────────────────────────────────

    /// Minimum angular distance (degrees) from `p` to any point of the box;
    /// zero when `p` is inside, infinite for the empty box.
    pub(crate) fn min_sep(&self, p: &Vector) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        let (lon, lat) = spherical_coords(*p);
        if self.contains_lon_lat(lon, lat) {
            return 0.0;
        }
        let mut best = f64::INFINITY;
        for edge_lat in [self.lat_min, self.lat_max] {
            let d = if self.lon_in_range(lon) {
                (lat - edge_lat).abs()
            } else {
                spherical_angular_sep((lon, lat), (self.lon_min, edge_lat))
                    .min(spherical_angular_sep((lon, lat), (self.lon_max, edge_lat)))
            };
            best = best.min(d);
        }
        if !self.is_full_lon() {
            for edge_lon in [self.lon_min, self.lon_max] {
                best = best.min(self.meridian_sep(lon, lat, edge_lon));
            }
        }
        best
    }

    /// Distance from `(lon, lat)` to the meridian segment at `edge_lon`
    /// spanning the box's latitude range.
    fn meridian_sep(&self, lon: f64, lat: f64, edge_lon: f64) -> f64 {
        let dlon = (lon - edge_lon).to_radians();
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        let foot = sin_lat.atan2(cos_lat * dlon.cos()).to_degrees();
        let mut best = spherical_angular_sep((lon, lat), (edge_lon, self.lat_min))
            .min(spherical_angular_sep((lon, lat), (edge_lon, self.lat_max)));
        if self.lat_in_range(foot) {
            best = best.min(spherical_angular_sep((lon, lat), (edge_lon, foot)));
        }
        best
    }

    // ── Box / other regions ────────────────────────────────────────────────

    /// A box is a product of a longitude range and a latitude range, so it
    /// contains a circle exactly when it contains the circle's unpadded
    /// longitude/latitude extent.
    pub fn contains_circle(&self, circle: &SphericalCircle) -> bool {
        self.contains_box(&circle.extent())
    }

    /// Tested against the padded bounding box, so a box fitting the ellipse
    /// to within [`ANGLE_EPSILON`] may be reported as not containing it.
    pub fn contains_ellipse(&self, ellipse: &SphericalEllipse) -> bool {
        self.contains_box(&ellipse.bounding_box())
    }

    /// Same padding caveat as [`Self::contains_ellipse`] where an edge bulges
    /// past its endpoints' latitudes.
    pub fn contains_polygon(&self, polygon: &SphericalConvexPolygon) -> bool {
        self.contains_box(&polygon.bounding_box())
    }

    pub fn intersects_circle(&self, circle: &SphericalCircle) -> bool {
        self.min_sep(circle.center()) <= circle.radius()
    }

    /// Bracketed between the ellipse's inner and bounding circles; the
    /// undecided band is reported as intersecting.
    pub fn intersects_ellipse(&self, ellipse: &SphericalEllipse) -> bool {
        if self.intersects_circle(&ellipse.inner_circle()) {
            return true;
        }
        self.intersects_circle(&ellipse.bounding_circle())
    }

    pub fn intersects_polygon(&self, polygon: &SphericalConvexPolygon) -> bool {
        polygon.intersects_box(self)
    }
}

impl SphericalRegion for SphericalBox {
    fn bounding_box(&self) -> SphericalBox {
        *self
    }

    /// Centred on the box centre for boxes up to 180 degrees wide, otherwise
    /// on the nearer pole. The empty box yields a zero-radius circle.
    fn bounding_circle(&self) -> SphericalCircle {
        let Some(center) = self.center() else {
            return SphericalCircle::from_parts(Vector::X, 0.0);
        };
        if self.width() > 180.0 {
            let north = 90.0 - self.lat_min;
            let south = 90.0 + self.lat_max;
            return if north <= south {
                SphericalCircle::from_parts(Vector::Z, north.min(180.0))
            } else {
                SphericalCircle::from_parts(-Vector::Z, south.min(180.0))
            };
        }
        let c = cartesian_unit_vector(center);
        let radius = self
            .corners()
            .iter()
            .map(|v| cartesian_angular_sep(&c, v))
            .fold(0.0, f64::max);
        SphericalCircle::from_parts(c, (radius + ANGLE_EPSILON).min(180.0))
    }

    fn contains_point(&self, point: impl Into<Coords>) -> bool {
        let (lon, lat) = spherical_coords(point);
        self.contains_lon_lat(lon, lat)
    }
}

/// Shortest longitude range covering both `a` and `b`, trying each 360
/// degree shift of `b`.
fn lon_hull(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    let mut best = (0.0, 360.0);
    let mut best_width = f64::INFINITY;
    for k in [-360.0, 0.0, 360.0] {
        let lo = a.0.min(b.0 + k);
        let hi = a.1.max(b.1 + k);
        if hi - lo < best_width {
            best_width = hi - lo;
            best = (lo, hi);
        }
    }
    if best_width >= 360.0 { (0.0, 360.0) } else { best }
}
