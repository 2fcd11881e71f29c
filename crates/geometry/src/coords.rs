//! Conversions between spherical (lon, lat) coordinates and unit vectors, and
//! the small-circle trigonometry used to size bounding boxes.
//!
//! All angles are in degrees. Longitude is `lon`, latitude is `lat`.

use serde::{Deserialize, Serialize};

use crate::constants::{ANGLE_EPSILON, POLE_EPSILON};
use crate::vector::Vector;

/// A position given either as spherical coordinates or as a Cartesian vector.
///
/// Callers that do not know which representation they hold can hand either to
/// [`cartesian_unit_vector`] or [`spherical_coords`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coords {
    /// `(lon, lat)` in degrees.
    Spherical(f64, f64),
    /// A Cartesian vector, assumed to be of unit length.
    Cartesian(Vector),
}

impl From<(f64, f64)> for Coords {
    fn from((lon, lat): (f64, f64)) -> Self {
        Coords::Spherical(lon, lat)
    }
}

impl From<[f64; 3]> for Coords {
    fn from(xyz: [f64; 3]) -> Self {
        Coords::Cartesian(Vector::from_array(xyz))
    }
}

impl From<Vector> for Coords {
    fn from(v: Vector) -> Self {
        Coords::Cartesian(v)
    }
}

impl From<&Vector> for Coords {
    fn from(v: &Vector) -> Self {
        Coords::Cartesian(*v)
    }
}

/// Unit vector for a position. Cartesian input is passed through unchanged;
/// its length is the caller's responsibility.
pub fn cartesian_unit_vector(coords: impl Into<Coords>) -> Vector {
    match coords.into() {
        Coords::Spherical(lon, lat) => {
            let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
            let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
            Vector::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
        }
        Coords::Cartesian(v) => v,
    }
}

/// Spherical coordinates `(lon, lat)` of a position, with `lon` in `[0, 360)`
/// for Cartesian input. Spherical input is returned as given.
pub fn spherical_coords(coords: impl Into<Coords>) -> (f64, f64) {
    match coords.into() {
        Coords::Spherical(lon, lat) => (lon, lat),
        Coords::Cartesian(v) => {
            let d2 = v.x * v.x + v.y * v.y;
            let lon = if d2 == 0.0 {
                0.0
            } else {
                reduce_lon(v.y.atan2(v.x).to_degrees())
            };
            let lat = clamp_phi(v.z.atan2(d2.sqrt()).to_degrees());
            (lon, lat)
        }
    }
}

/// Reduce a longitude into `[0, 360)`.
pub fn reduce_lon(lon: f64) -> f64 {
    let r = lon % 360.0;
    let r = if r < 0.0 { r + 360.0 } else { r };
    // -tiny % 360 + 360 rounds to exactly 360.
    if r >= 360.0 { 0.0 } else { r }
}

/// Clamp a latitude to `[-90, 90]`.
pub fn clamp_phi(lat: f64) -> f64 {
    lat.clamp(-90.0, 90.0)
}

/// Orthonormal `(north, east)` basis of the tangent plane at unit vector `v`.
///
/// At the poles north is ill-defined; there the basis of the `lon = 0`
/// meridian's limit is returned, so callers needing a different convention
/// must special-case the poles themselves.
pub fn north_east(v: &Vector) -> (Vector, Vector) {
    let north = Vector::new(-v.x * v.z, -v.y * v.z, v.x * v.x + v.y * v.y);
    let north = match north.normalize() {
        Ok(n) => n,
        Err(_) if v.z >= 0.0 => Vector::new(-1.0, 0.0, 0.0),
        Err(_) => Vector::new(1.0, 0.0, 0.0),
    };
    let east = north.cross(v);
    let east = east.normalize().unwrap_or(Vector::Y);
    (north, east)
}

/// Great-circle distance in degrees between two unit vectors.
pub fn cartesian_angular_sep(v1: &Vector, v2: &Vector) -> f64 {
    let s = v1.cross(v2).norm();
    let c = v1.dot(v2);
    if s == 0.0 && c == 0.0 {
        return 0.0;
    }
    s.atan2(c).to_degrees()
}

/// Great-circle distance in degrees between two `(lon, lat)` positions.
pub fn spherical_angular_sep(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    // Vincenty's formula: well conditioned at every separation.
    let (lon1, lat1) = (p1.0.to_radians(), p1.1.to_radians());
    let (lon2, lat2) = (p2.0.to_radians(), p2.1.to_radians());
    let (sin_dlon, cos_dlon) = (lon2 - lon1).sin_cos();
    let (sin1, cos1) = lat1.sin_cos();
    let (sin2, cos2) = lat2.sin_cos();
    let a = cos2 * sin_dlon;
    let b = cos1 * sin2 - sin1 * cos2 * cos_dlon;
    let num = a.hypot(b);
    let den = sin1 * sin2 + cos1 * cos2 * cos_dlon;
    num.atan2(den).to_degrees()
}

/// Longitude half-width `alpha` such that the point at latitude `lat`,
/// `alpha` degrees of longitude away from a point at latitude `center_lat`,
/// lies exactly `r` degrees from it.
///
/// `None` when no such point exists: the latitudes differ by more than `r`,
/// either latitude is at a pole, or every point of the parallel is within
/// `r`.
pub fn alpha(r: f64, center_lat: f64, lat: f64) -> Option<f64> {
    if (lat - center_lat).abs() > r {
        return None;
    }
    if center_lat.abs() > 90.0 - POLE_EPSILON || lat.abs() > 90.0 - POLE_EPSILON {
        return None;
    }
    let (sin_c, cos_c) = center_lat.to_radians().sin_cos();
    let (sin_l, cos_l) = lat.to_radians().sin_cos();
    let u = cos_c * cos_l;
    if u <= 0.0 {
        return None;
    }
    let x = (r.to_radians().cos() - sin_c * sin_l) / u;
    const SLACK: f64 = 1e-12;
    if !(-1.0 - SLACK..=1.0 + SLACK).contains(&x) {
        return None;
    }
    Some(x.clamp(-1.0, 1.0).acos().to_degrees())
}

/// Longitude half-width of the bounding box of a circle of radius `r`
/// centred at latitude `center_lat`: the largest [`alpha`] over the circle,
/// widened by [`ANGLE_EPSILON`]. Returns 180 when the circle reaches a pole.
pub fn max_alpha(r: f64, center_lat: f64) -> f64 {
    if r <= 0.0 {
        return 0.0;
    }
    if center_lat.abs() + r > 90.0 - POLE_EPSILON {
        return 180.0;
    }
    (max_alpha_unpadded(r, center_lat) + ANGLE_EPSILON).min(180.0)
}

/// [`max_alpha`] without the containment margin; 180 only when the circle
/// actually reaches a pole.
pub(crate) fn max_alpha_unpadded(r: f64, center_lat: f64) -> f64 {
    if r <= 0.0 {
        return 0.0;
    }
    if center_lat.abs() + r >= 90.0 {
        return 180.0;
    }
    let (c, r) = (center_lat.to_radians(), r.to_radians());
    let y = r.sin();
    let x = ((c - r).cos() * (c + r).cos()).abs().sqrt();
    y.atan2(x).to_degrees().min(180.0)
}
