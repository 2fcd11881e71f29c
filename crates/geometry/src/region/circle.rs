use serde::{Deserialize, Serialize};

use super::ellipse::SphericalEllipse;
use super::polygon::SphericalConvexPolygon;
use super::spherical_box::SphericalBox;
use super::SphericalRegion;
use crate::constants::ANGLE_EPSILON;
use crate::coords::{Coords, cartesian_angular_sep, cartesian_unit_vector, clamp_phi, max_alpha, max_alpha_unpadded, spherical_coords};
use crate::error::{GeometryError, Result};
use crate::numeric;
use crate::vector::Vector;

/// A spherical cap: every point within `radius` degrees of `center`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphericalCircle {
    center: Vector,
    radius: f64,
}

impl SphericalCircle {
    /// Circle of `radius` degrees, which must lie in `[0, 180]`. The centre
    /// is normalized to unit length.
    pub fn new(center: impl Into<Coords>, radius: f64) -> Result<Self> {
        if !radius.is_finite() || !(0.0..=180.0).contains(&radius) {
            return Err(GeometryError::invalid(format!(
                "circle radius {radius} outside [0, 180]"
            )));
        }
        let center = cartesian_unit_vector(center).normalize()?;
        Ok(Self { center, radius })
    }

    pub(crate) fn from_parts(center: Vector, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn center(&self) -> &Vector {
        &self.center
    }

    /// Radius in degrees.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Solid angle in steradians.
    pub fn area(&self) -> f64 {
        std::f64::consts::TAU * (1.0 - self.radius.to_radians().cos())
    }

    /// Point at angle `t` (radians, measured from north through east) on
    /// the boundary.
    pub(crate) fn boundary_point(&self, t: f64) -> Vector {
        let (north, east) = crate::coords::north_east(&self.center);
        let (sin_r, cos_r) = self.radius.to_radians().sin_cos();
        let (sin_t, cos_t) = t.sin_cos();
        self.center * cos_r + (north * cos_t + east * sin_t) * sin_r
    }

    pub fn contains_box(&self, b: &SphericalBox) -> bool {
        if b.is_empty() {
            return false;
        }
        if self.radius >= 180.0 {
            return true;
        }
        // The farthest box point from the centre is the nearest one to the
        // antipode.
        180.0 - b.min_sep(&-self.center) <= self.radius
    }

    pub fn contains_circle(&self, other: &SphericalCircle) -> bool {
        cartesian_angular_sep(&self.center, &other.center) + other.radius <= self.radius
    }

    /// Exact when the bounding circle decides; otherwise the ellipse
    /// boundary is searched for its farthest point.
    pub fn contains_ellipse(&self, ellipse: &SphericalEllipse) -> bool {
        if self.contains_circle(&ellipse.bounding_circle()) {
            return true;
        }
        if !self.contains_circle(&ellipse.inner_circle()) {
            return false;
        }
        let farthest = numeric::maximize(
            |t| cartesian_angular_sep(&self.center, &ellipse.boundary_point(t)),
            0.0,
            std::f64::consts::TAU,
        );
        farthest + ANGLE_EPSILON <= self.radius
    }

    pub fn contains_polygon(&self, polygon: &SphericalConvexPolygon) -> bool {
        if !polygon.vertices().iter().all(|v| self.contains_point(v)) {
            return false;
        }
        // Caps wider than a hemisphere are not convex; the polygon must also
        // keep clear of the excluded cap around the antipode.
        self.radius <= 90.0 || polygon.min_sep(&-self.center) >= 180.0 - self.radius
    }

    /// Exact longitude/latitude extent, with no containment margin.
    pub(crate) fn extent(&self) -> SphericalBox {
        self.covering_box(0.0, max_alpha_unpadded)
    }

    fn covering_box(&self, margin: f64, half_width: fn(f64, f64) -> f64) -> SphericalBox {
        if self.radius >= 180.0 {
            return SphericalBox::full();
        }
        let (lon, lat) = spherical_coords(self.center);
        let lat_min = clamp_phi(lat - self.radius - margin);
        let lat_max = clamp_phi(lat + self.radius + margin);
        let a = half_width(self.radius, lat);
        if a >= 180.0 {
            SphericalBox::from_raw(0.0, 360.0, lat_min, lat_max)
        } else {
            SphericalBox::from_raw(lon - a, lon + a, lat_min, lat_max)
        }
    }

    pub fn intersects_box(&self, b: &SphericalBox) -> bool {
        b.intersects_circle(self)
    }

    pub fn intersects_circle(&self, other: &SphericalCircle) -> bool {
        cartesian_angular_sep(&self.center, &other.center) <= self.radius + other.radius
    }

    pub fn intersects_ellipse(&self, ellipse: &SphericalEllipse) -> bool {
        ellipse.intersects_circle(self)
    }

    pub fn intersects_polygon(&self, polygon: &SphericalConvexPolygon) -> bool {
        polygon.intersects_circle(self)
    }
}

impl SphericalRegion for SphericalCircle {
    fn bounding_box(&self) -> SphericalBox {
        self.covering_box(ANGLE_EPSILON, max_alpha)
    }

    fn bounding_circle(&self) -> SphericalCircle {
        *self
    }

    fn contains_point(&self, point: impl Into<Coords>) -> bool {
        let p = cartesian_unit_vector(point);
        cartesian_angular_sep(&self.center, &p) <= self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn circle(lon: f64, lat: f64, r: f64) -> SphericalCircle {
        SphericalCircle::new((lon, lat), r).unwrap()
    }

    #[test]
    fn rejects_bad_radius_and_centre() {
        assert!(SphericalCircle::new((0.0, 0.0), -1.0).is_err());
        assert!(SphericalCircle::new((0.0, 0.0), 180.5).is_err());
        assert!(SphericalCircle::new((0.0, 0.0), f64::NAN).is_err());
        assert!(SphericalCircle::new(Vector::ZERO, 1.0).is_err());
        assert!(SphericalCircle::new((0.0, 0.0), 180.0).is_ok());
    }

    #[test]
    fn point_containment() {
        let c = circle(10.0, 20.0, 5.0);
        assert!(c.contains_point((10.0, 24.9)));
        assert!(!c.contains_point((10.0, 25.1)));
        assert!(c.contains_point(cartesian_unit_vector((12.0, 21.0))));
    }

    #[test]
    fn circle_circle() {
        let big = circle(0.0, 0.0, 10.0);
        let small = circle(3.0, 0.0, 2.0);
        let far = circle(30.0, 0.0, 5.0);
        assert!(big.contains_circle(&small));
        assert!(!small.contains_circle(&big));
        assert!(big.intersects_circle(&small));
        assert!(!big.intersects_circle(&far));
        assert!(circle(20.0, 0.0, 5.0).intersects_circle(&far));
    }

    #[test]
    fn bounding_box_covers_boundary() {
        for &(lon, lat, r) in &[(0.0, 0.0, 5.0), (359.0, 45.0, 3.0), (120.0, -70.0, 10.0)] {
            let c = circle(lon, lat, r);
            let b = c.bounding_box();
            for i in 0..72 {
                let p = c.boundary_point(i as f64 * 5f64.to_radians());
                assert!(b.contains_point(p), "{p:?} outside {b:?}");
            }
        }
    }

    #[test]
    fn bounding_box_over_pole_is_full_longitude() {
        let b = circle(0.0, 85.0, 10.0).bounding_box();
        assert!(b.is_full_lon());
        assert_eq!(b.lat_max(), 90.0);
        assert_abs_diff_eq!(b.lat_min(), 75.0, epsilon = 1e-6);
    }

    #[test]
    fn box_containment() {
        let c = circle(0.0, 0.0, 10.0);
        let inner = SphericalBox::new((-5.0, -5.0), (5.0, 5.0)).unwrap();
        let outer = SphericalBox::new((-9.0, -9.0), (9.0, 9.0)).unwrap();
        assert!(c.contains_box(&inner));
        // The corners of a 9 degree box are about 12.7 degrees out.
        assert!(!c.contains_box(&outer));
        assert!(c.intersects_box(&outer));
        assert!(circle(0.0, 0.0, 180.0).contains_box(&SphericalBox::full()));
    }

    #[test]
    fn area_of_hemisphere() {
        assert_abs_diff_eq!(circle(0.0, 90.0, 90.0).area(), std::f64::consts::TAU, epsilon = 1e-12);
    }
}
