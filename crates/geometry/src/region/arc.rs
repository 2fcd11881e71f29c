//! Great-circle arc primitives shared by the region predicates.
//!
//! An arc is given by its start and end points and the unit normal `n` of its
//! plane; it runs counter-clockwise about `n` from start to end. Polygon
//! edges use `n = normalize(start x end)`, which selects the short arc.

use std::f64::consts::TAU;

use crate::constants::CROSS_N2MIN;
use crate::coords::cartesian_angular_sep;
use crate::vector::Vector;

/// Angle (radians, in `[0, 2pi)`) swept counter-clockwise about `n` from
/// `start` to the projection of `p` onto the arc's plane.
fn sweep(start: &Vector, n: &Vector, p: &Vector) -> f64 {
    let y = p.dot(&n.cross(start));
    let x = p.dot(start);
    let a = y.atan2(x);
    if a < 0.0 { a + TAU } else { a }
}

/// Whether `p`, a point on the arc's great circle, lies on the arc.
pub(crate) fn on_arc(start: &Vector, end: &Vector, n: &Vector, p: &Vector) -> bool {
    const SLACK: f64 = 1e-12;
    let length = sweep(start, n, end);
    let a = sweep(start, n, p);
    a <= length + SLACK || a >= TAU - SLACK
}

/// Minimum angular distance (degrees) from `p` to the arc.
pub(crate) fn min_sep_to_arc(p: &Vector, start: &Vector, end: &Vector, n: &Vector) -> f64 {
    let endpoints = cartesian_angular_sep(p, start).min(cartesian_angular_sep(p, end));
    let h = p.dot(n);
    let q = *p - *n * h;
    let qn = q.norm();
    if qn < 1e-15 {
        // `p` is a pole of the great circle: every point is 90 degrees away.
        return endpoints.min(90.0);
    }
    if on_arc(start, end, n, &q) {
        h.abs().atan2(qn).to_degrees()
    } else {
        endpoints
    }
}

/// Points where the great circle with unit normal `n` meets the parallel at
/// latitude `lat` (degrees). Empty when they do not meet, or when the great
/// circle is the equator.
pub(crate) fn parallel_crossings(n: &Vector, lat: f64) -> Vec<Vector> {
    let h = n.x.hypot(n.y);
    if h < 1e-15 {
        return Vec::new();
    }
    let (z0, rho) = lat.to_radians().sin_cos();
    let delta = -n.z * z0 / h;
    if delta.abs() > rho {
        return Vec::new();
    }
    let t = (rho * rho - delta * delta).max(0.0).sqrt();
    let (dx, dy) = (n.x / h, n.y / h);
    let base = Vector::new(dx * delta, dy * delta, z0);
    let perp = Vector::new(-dy, dx, 0.0);
    if t == 0.0 {
        vec![base]
    } else {
        vec![base + perp * t, base - perp * t]
    }
}

/// Points where the great circle with unit normal `n` meets the meridian
/// half-plane at longitude `lon` (degrees). Empty when the great circle is
/// that meridian's own circle.
pub(crate) fn meridian_crossings(n: &Vector, lon: f64) -> Vec<Vector> {
    let (s, c) = lon.to_radians().sin_cos();
    let m = Vector::new(-s, c, 0.0);
    let d = n.cross(&m);
    if d.norm_squared() < CROSS_N2MIN {
        return Vec::new();
    }
    let d = d / d.norm();
    let toward = Vector::new(c, s, 0.0);
    [d, -d]
        .into_iter()
        .filter(|p| p.dot(&toward) >= -1e-15)
        .collect()
}
