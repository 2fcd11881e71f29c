use std::f64::consts::TAU;

use nalgebra::{Matrix3, RowVector3};
use serde::{Deserialize, Serialize};

use super::circle::SphericalCircle;
use super::polygon::SphericalConvexPolygon;
use super::spherical_box::SphericalBox;
use super::SphericalRegion;
use crate::constants::{ANGLE_EPSILON, DEG_PER_ARCSEC, MAX_ELLIPSE_SEMI_MAJOR_ARCSEC};
use crate::coords::{Coords, cartesian_angular_sep, cartesian_unit_vector, clamp_phi, north_east, spherical_coords};
use crate::error::{GeometryError, Result};
use crate::numeric::{maximize, minimize};
use crate::vector::Vector;

/// Slack kept below the unit level set when a containment test relies on a
/// sampled maximum.
const FORM_MARGIN: f64 = 1e-9;

/// An ellipse on the sphere: the gnomonic image of a plane ellipse centred
/// on the tangent point.
///
/// The semi-axes are angular lengths in arcseconds. The major axis points
/// `position_angle` degrees east of north.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphericalEllipse {
    center: Vector,
    semi_major_arcsec: f64,
    semi_minor_arcsec: f64,
    position_angle: f64,
    /// Rows are the major-axis direction, the minor-axis direction and the
    /// centre; multiplying a point by this matrix gives its frame coordinates.
    frame: Matrix3<f64>,
    tan_major: f64,
    tan_minor: f64,
}

impl SphericalEllipse {
    pub fn new(
        center: impl Into<Coords>,
        semi_major_arcsec: f64,
        semi_minor_arcsec: f64,
        position_angle: f64,
    ) -> Result<Self> {
        if !(semi_major_arcsec.is_finite() && semi_minor_arcsec.is_finite() && position_angle.is_finite()) {
            return Err(GeometryError::invalid("ellipse parameters must be finite"));
        }
        if semi_minor_arcsec <= 0.0 {
            return Err(GeometryError::invalid(format!(
                "ellipse semi-minor axis {semi_minor_arcsec} must be positive"
            )));
        }
        if semi_minor_arcsec > semi_major_arcsec {
            return Err(GeometryError::invalid(format!(
                "ellipse semi-minor axis {semi_minor_arcsec} exceeds semi-major axis {semi_major_arcsec}"
            )));
        }
        if semi_major_arcsec > MAX_ELLIPSE_SEMI_MAJOR_ARCSEC {
            return Err(GeometryError::invalid(format!(
                "ellipse semi-major axis {semi_major_arcsec} exceeds {MAX_ELLIPSE_SEMI_MAJOR_ARCSEC} arcsec"
            )));
        }
        let center = cartesian_unit_vector(center).normalize()?;
        let (north, east) = north_east(&center);
        let (sin_pa, cos_pa) = position_angle.to_radians().sin_cos();
        let major = north * cos_pa + east * sin_pa;
        let minor = east * cos_pa - north * sin_pa;
        let row = |v: Vector| RowVector3::new(v.x, v.y, v.z);
        let frame = Matrix3::from_rows(&[row(major), row(minor), row(center)]);
        Ok(Self {
            center,
            semi_major_arcsec,
            semi_minor_arcsec,
            position_angle,
            frame,
            tan_major: (semi_major_arcsec * DEG_PER_ARCSEC).to_radians().tan(),
            tan_minor: (semi_minor_arcsec * DEG_PER_ARCSEC).to_radians().tan(),
        })
    }

    pub fn center(&self) -> &Vector {
        &self.center
    }

    pub fn semi_major_arcsec(&self) -> f64 {
        self.semi_major_arcsec
    }

    pub fn semi_minor_arcsec(&self) -> f64 {
        self.semi_minor_arcsec
    }

    /// Position angle of the major axis, degrees east of north.
    pub fn position_angle(&self) -> f64 {
        self.position_angle
    }

    /// Largest circle inside the ellipse: radius = semi-minor axis.
    pub fn inner_circle(&self) -> SphericalCircle {
        SphericalCircle::from_parts(self.center, self.semi_minor_arcsec * DEG_PER_ARCSEC)
    }

    fn axis(&self, i: usize) -> Vector {
        let r = self.frame.row(i);
        Vector::new(r[0], r[1], r[2])
    }

    /// Value of the ellipse's quadratic form at `v`: at most 1 inside, above
    /// 1 outside. `None` for points in the hemisphere facing away from the
    /// centre, which the gnomonic frame cannot reach.
    fn form(&self, v: &Vector) -> Option<f64> {
        let p = self.frame * v.to_na();
        if p.z <= 0.0 {
            return None;
        }
        let x = p.x / p.z / self.tan_major;
        let y = p.y / p.z / self.tan_minor;
        Some(x * x + y * y)
    }

    fn form_or_inf(&self, v: &Vector) -> f64 {
        self.form(v).unwrap_or(f64::INFINITY)
    }

    /// Boundary point at eccentric anomaly `t` (radians).
    pub(crate) fn boundary_point(&self, t: f64) -> Vector {
        let (sin_t, cos_t) = t.sin_cos();
        let v = self.center + self.axis(0) * (self.tan_major * cos_t) + self.axis(1) * (self.tan_minor * sin_t);
        v / v.norm()
    }

    /// Largest value of the form along the parallel at `lat` between the two
    /// longitudes.
    fn max_form_on_parallel(&self, lat: f64, lon_min: f64, lon_max: f64) -> f64 {
        maximize(|lon| self.form_or_inf(&cartesian_unit_vector((lon, lat))), lon_min, lon_max)
    }

    pub fn contains_box(&self, b: &SphericalBox) -> bool {
        if b.is_empty() {
            return false;
        }
        if self.inner_circle().contains_box(b) {
            return true;
        }
        if !self.bounding_circle().contains_box(b) {
            return false;
        }
        // Meridian edges are great-circle arcs, straight in the gnomonic
        // frame, so the corners cover them. Parallels are searched.
        if !b.corners().iter().all(|v| self.form_or_inf(v) <= 1.0) {
            return false;
        }
        [b.lat_min(), b.lat_max()]
            .iter()
            .all(|&lat| self.max_form_on_parallel(lat, b.lon_min(), b.lon_max()) <= 1.0 - FORM_MARGIN)
    }

    pub fn contains_circle(&self, c: &SphericalCircle) -> bool {
        if self.inner_circle().contains_circle(c) {
            return true;
        }
        if !self.bounding_circle().contains_circle(c) {
            return false;
        }
        maximize(|t| self.form_or_inf(&c.boundary_point(t)), 0.0, TAU) <= 1.0 - FORM_MARGIN
    }

    pub fn contains_ellipse(&self, other: &SphericalEllipse) -> bool {
        if self.inner_circle().contains_circle(&other.bounding_circle()) {
            return true;
        }
        if !self.bounding_circle().contains_circle(&other.inner_circle()) {
            return false;
        }
        maximize(|t| self.form_or_inf(&other.boundary_point(t)), 0.0, TAU) <= 1.0 - FORM_MARGIN
    }

    /// Exact: the ellipse is convex in the gnomonic frame and polygon edges
    /// are straight there.
    pub fn contains_polygon(&self, polygon: &SphericalConvexPolygon) -> bool {
        polygon.vertices().iter().all(|v| self.contains_point(v))
    }

    pub fn intersects_box(&self, b: &SphericalBox) -> bool {
        b.intersects_ellipse(self)
    }

    pub fn intersects_circle(&self, c: &SphericalCircle) -> bool {
        if self.inner_circle().intersects_circle(c) {
            return true;
        }
        if !self.bounding_circle().intersects_circle(c) {
            return false;
        }
        if self.contains_point(c.center()) {
            return true;
        }
        let nearest = minimize(|t| cartesian_angular_sep(c.center(), &self.boundary_point(t)), 0.0, TAU);
        nearest <= c.radius() + ANGLE_EPSILON
    }

    /// Bracketed between inner and bounding circles; the undecided band is
    /// reported as intersecting.
    pub fn intersects_ellipse(&self, other: &SphericalEllipse) -> bool {
        if self.inner_circle().intersects_circle(&other.inner_circle()) {
            return true;
        }
        self.bounding_circle().intersects_circle(&other.bounding_circle())
    }

    pub fn intersects_polygon(&self, polygon: &SphericalConvexPolygon) -> bool {
        polygon.intersects_ellipse(self)
    }

    /// The ellipse's support along an edge plane: `n . c` and the half-width
    /// of `n . v` over the boundary, both scaled by the gnomonic factor.
    pub(crate) fn plane_extent(&self, n: &Vector) -> (f64, f64) {
        let nu = n.dot(&self.axis(0)) * self.tan_major;
        let nw = n.dot(&self.axis(1)) * self.tan_minor;
        (n.dot(&self.center), nu.hypot(nw))
    }
}

impl SphericalRegion for SphericalEllipse {
    /// Tight box found by searching the boundary for its latitude and
    /// longitude extremes, padded by `ANGLE_EPSILON`.
    fn bounding_box(&self) -> SphericalBox {
        let lat_of = |t: f64| spherical_coords(self.boundary_point(t)).1;
        let lat_max = maximize(lat_of, 0.0, TAU) + ANGLE_EPSILON;
        let lat_min = minimize(lat_of, 0.0, TAU) - ANGLE_EPSILON;
        if self.contains_point(Vector::Z) {
            return SphericalBox::from_raw(0.0, 360.0, clamp_phi(lat_min), 90.0);
        }
        if self.contains_point(-Vector::Z) {
            return SphericalBox::from_raw(0.0, 360.0, -90.0, clamp_phi(lat_max));
        }
        let (lon_c, _) = spherical_coords(self.center);
        let dlon = |t: f64| wrap180(spherical_coords(self.boundary_point(t)).0 - lon_c);
        let hi = maximize(dlon, 0.0, TAU) + ANGLE_EPSILON;
        let lo = minimize(dlon, 0.0, TAU) - ANGLE_EPSILON;
        SphericalBox::from_raw(lon_c + lo, lon_c + hi, clamp_phi(lat_min), clamp_phi(lat_max))
    }

    /// Smallest circle around the ellipse: radius = semi-major axis.
    fn bounding_circle(&self) -> SphericalCircle {
        SphericalCircle::from_parts(self.center, self.semi_major_arcsec * DEG_PER_ARCSEC)
    }

    fn contains_point(&self, point: impl Into<Coords>) -> bool {
        let p = cartesian_unit_vector(point);
        self.form(&p).is_some_and(|q| q <= 1.0)
    }
}

fn wrap180(x: f64) -> f64 {
    x - 360.0 * (x / 360.0).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ellipse(lon: f64, lat: f64, a_deg: f64, b_deg: f64, pa: f64) -> SphericalEllipse {
        SphericalEllipse::new((lon, lat), a_deg * 3600.0, b_deg * 3600.0, pa).unwrap()
    }

    #[test]
    fn validates_axes() {
        assert!(SphericalEllipse::new((0.0, 0.0), 10.0, 20.0, 0.0).is_err());
        assert!(SphericalEllipse::new((0.0, 0.0), 10.0, 0.0, 0.0).is_err());
        assert!(SphericalEllipse::new((0.0, 0.0), 11.0 * 3600.0, 3600.0, 0.0).is_err());
        assert!(SphericalEllipse::new((0.0, 0.0), f64::NAN, 1.0, 0.0).is_err());
        assert!(SphericalEllipse::new((0.0, 0.0), 10.0 * 3600.0, 3600.0, 0.0).is_ok());
    }

    #[test]
    fn major_axis_follows_position_angle() {
        // pa = 0: major axis points north.
        let e = ellipse(0.0, 0.0, 2.0, 1.0, 0.0);
        assert!(e.contains_point((0.0, 1.9)));
        assert!(!e.contains_point((1.9, 0.0)));
        assert!(e.contains_point((0.9, 0.0)));
        // pa = 90: major axis points east.
        let e = ellipse(0.0, 0.0, 2.0, 1.0, 90.0);
        assert!(e.contains_point((1.9, 0.0)));
        assert!(!e.contains_point((0.0, 1.9)));
        assert!(!e.contains_point((180.0, 0.0)));
    }

    #[test]
    fn boundary_lies_on_unit_level_set() {
        let e = ellipse(40.0, -30.0, 3.0, 1.0, 25.0);
        for i in 0..16 {
            let q = e.form(&e.boundary_point(i as f64 * 0.4)).unwrap();
            assert_abs_diff_eq!(q, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn circles_bracket_the_ellipse() {
        let e = ellipse(100.0, 20.0, 2.0, 0.5, 60.0);
        assert_abs_diff_eq!(e.inner_circle().radius(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(e.bounding_circle().radius(), 2.0, epsilon = 1e-12);
        for i in 0..32 {
            let b = e.boundary_point(i as f64 * TAU / 32.0);
            let d = cartesian_angular_sep(e.center(), &b);
            assert!(d >= 0.5 - 1e-9 && d <= 2.0 + 1e-9);
        }
    }

    #[test]
    fn bounding_box_covers_boundary() {
        for &(lon, lat, pa) in &[(0.0, 0.0, 30.0), (359.5, 60.0, 80.0), (200.0, -75.0, 10.0)] {
            let e = ellipse(lon, lat, 4.0, 1.5, pa);
            let b = e.bounding_box();
            for i in 0..90 {
                let p = e.boundary_point(i as f64 * TAU / 90.0);
                assert!(b.contains_point(p), "{p:?} outside {b:?}");
            }
            assert!(e.bounding_circle().bounding_box().contains_box(&b));
        }
    }

    #[test]
    fn bounding_box_around_pole() {
        let e = ellipse(0.0, 88.0, 5.0, 3.0, 0.0);
        let b = e.bounding_box();
        assert!(b.is_full_lon());
        assert_eq!(b.lat_max(), 90.0);
        assert!(b.lat_min() < 85.0);
    }

    #[test]
    fn contains_box_and_circle() {
        let e = ellipse(10.0, 10.0, 3.0, 2.0, 0.0);
        let small = SphericalBox::new((9.0, 9.0), (11.0, 11.0)).unwrap();
        let tall = SphericalBox::new((9.9, 7.5), (10.1, 12.5)).unwrap();
        let wide = SphericalBox::new((7.5, 9.9), (12.5, 10.1)).unwrap();
        assert!(e.contains_box(&small));
        assert!(e.contains_box(&tall));
        assert!(!e.contains_box(&wide));
        assert!(e.contains_circle(&SphericalCircle::new((10.0, 11.0), 1.5).unwrap()));
        assert!(!e.contains_circle(&SphericalCircle::new((12.0, 10.0), 1.5).unwrap()));
    }

    #[test]
    fn ellipse_circle_intersection() {
        let e = ellipse(0.0, 0.0, 3.0, 1.0, 0.0);
        assert!(e.intersects_circle(&SphericalCircle::new((0.0, 3.5), 1.0).unwrap()));
        assert!(!e.intersects_circle(&SphericalCircle::new((2.5, 0.0), 1.0).unwrap()));
        assert!(!e.intersects_circle(&SphericalCircle::new((40.0, 0.0), 1.0).unwrap()));
    }
}
