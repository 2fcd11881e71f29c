//! Hemisphere tests, spherical convex hulls and vertex-loop validation.

use std::f64::consts::{PI, TAU};

use tracing::{debug, instrument, trace};

use crate::constants::CROSS_N2MIN;
use crate::coords::north_east;
use crate::region::polygon::{DOT_SLACK, SphericalConvexPolygon};
use crate::vector::Vector;

/// Whether every point lies strictly inside one open hemisphere, with at
/// least `ANGLE_EPSILON` to spare.
///
/// Equivalently, the origin is farther than the margin from the convex hull
/// of the points. A point and its antipode, or points surrounding a pole on
/// both sides of the equator, are not hemispherical. The empty set is not
/// hemispherical.
pub fn hemispherical(points: &[Vector]) -> bool {
    separating_direction(points).is_some()
}

/// A unit vector `h` with `p . h > sin(ANGLE_EPSILON)` for every point, found
/// by a GJK distance query between the origin and the points' convex hull.
fn separating_direction(points: &[Vector]) -> Option<Vector> {
    let first = points.first()?;
    let mut simplex = vec![*first];
    let mut closest = *first;
    let max_iterations = 4 * points.len() + 32;

    for iteration in 0..max_iterations {
        let dist = closest.norm();
        if dist <= DOT_SLACK {
            trace!(iteration, "origin reached the hull");
            return None;
        }
        let dir = closest / dist;
        let support = points
            .iter()
            .copied()
            .min_by(|a, b| a.dot(&dir).total_cmp(&b.dot(&dir)))?;
        let lower = support.dot(&dir);
        if lower > DOT_SLACK {
            trace!(iteration, lower, "separating plane found");
            return Some(dir);
        }
        if dist - lower <= 1e-12 {
            // Converged on a hull distance inside the margin.
            return None;
        }
        simplex.push(support);
        (closest, simplex) = closest_on_simplex(&simplex);
    }
    debug!(max_iterations, "hemisphere search hit its iteration cap");
    None
}

/// Point of the simplex's convex hull nearest the origin, together with the
/// smallest sub-simplex that contains it.
fn closest_on_simplex(simplex: &[Vector]) -> (Vector, Vec<Vector>) {
    match *simplex {
        [a] => (a, vec![a]),
        [a, b] => closest_on_segment(a, b),
        [a, b, c] => closest_on_triangle(a, b, c),
        [a, b, c, d] => closest_on_tetrahedron(a, b, c, d),
        _ => (Vector::ZERO, simplex.to_vec()),
    }
}

fn closest_on_segment(a: Vector, b: Vector) -> (Vector, Vec<Vector>) {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (a, vec![a]);
    }
    let t = -a.dot(&ab) / len2;
    if t <= 0.0 {
        (a, vec![a])
    } else if t >= 1.0 {
        (b, vec![b])
    } else {
        (a + ab * t, vec![a, b])
    }
}

/// Voronoi-region walk over the triangle's vertices, edges and face.
fn closest_on_triangle(a: Vector, b: Vector, c: Vector) -> (Vector, Vec<Vector>) {
    let ab = b - a;
    let ac = c - a;
    let d1 = -ab.dot(&a);
    let d2 = -ac.dot(&a);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, vec![a]);
    }
    let d3 = -ab.dot(&b);
    let d4 = -ac.dot(&b);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, vec![b]);
    }
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3);
        return (a + ab * t, vec![a, b]);
    }
    let d5 = -ab.dot(&c);
    let d6 = -ac.dot(&c);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, vec![c]);
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6);
        return (a + ac * t, vec![a, c]);
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * t, vec![b, c]);
    }
    let total = va + vb + vc;
    if total.abs() < 1e-300 {
        // Collinear corners: the nearest of the three edges.
        return [closest_on_segment(a, b), closest_on_segment(b, c), closest_on_segment(a, c)]
            .into_iter()
            .min_by(|x, y| x.0.norm_squared().total_cmp(&y.0.norm_squared()))
            .unwrap_or((a, vec![a]));
    }
    let v = vb / total;
    let w = vc / total;
    (a + ab * v + ac * w, vec![a, b, c])
}

fn closest_on_tetrahedron(a: Vector, b: Vector, c: Vector, d: Vector) -> (Vector, Vec<Vector>) {
    let faces = [(a, b, c, d), (a, c, d, b), (a, d, b, c), (b, d, c, a)];
    let mut best: Option<(Vector, Vec<Vector>)> = None;
    for (p, q, r, opposite) in faces {
        let n = (q - p).cross(&(r - p));
        let origin_side = -n.dot(&p);
        let opposite_side = n.dot(&(opposite - p));
        // The origin is beyond this face, or the tetrahedron is flat.
        if origin_side * opposite_side < 0.0 || opposite_side == 0.0 {
            let candidate = closest_on_triangle(p, q, r);
            let better = best
                .as_ref()
                .is_none_or(|(x, _)| candidate.0.norm_squared() < x.norm_squared());
            if better {
                best = Some(candidate);
            }
        }
    }
    best.unwrap_or((Vector::ZERO, vec![a, b, c, d]))
}

/// Total order on vectors used to canonicalize point sets.
fn cmp_vectors(a: &Vector, b: &Vector) -> std::cmp::Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

/// Smallest convex polygon containing every point, or `None` when the
/// points are not [`hemispherical`] or span fewer than three hull vertices.
///
/// The points are mapped by gnomonic projection onto the plane tangent at a
/// separating direction, where great circles become straight lines, and the
/// planar hull is taken there. Duplicate points collapse to one vertex and
/// points on a hull edge are dropped. The vertices come back
/// counter-clockwise starting from the smallest in `(x, y, z)` order, so the
/// result does not depend on input order.
#[instrument(skip(points), fields(n = points.len()))]
pub fn convex_hull(points: &[Vector]) -> Option<SphericalConvexPolygon> {
    let mut points: Vec<Vector> = points.iter().map(Vector::normalize).collect::<Result<_, _>>().ok()?;
    points.sort_by(cmp_vectors);
    points.dedup();

    let h = separating_direction(&points)?;
    let (north, east) = north_east(&h);
    let mut projected: Vec<(f64, f64, Vector)> = points
        .iter()
        .map(|p| {
            let q = *p / p.dot(&h);
            (q.dot(&east), q.dot(&north), *p)
        })
        .collect();
    projected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let turn = |o: &(f64, f64, Vector), a: &(f64, f64, Vector), b: &(f64, f64, Vector)| {
        let (ax, ay) = (a.0 - o.0, a.1 - o.1);
        let (bx, by) = (b.0 - o.0, b.1 - o.1);
        let cross = ax * by - ay * bx;
        let scale = ax.hypot(ay) * bx.hypot(by);
        cross > 1e-12 * scale
    };

    // Andrew's monotone chain; only strict left turns survive.
    let mut hull: Vec<(f64, f64, Vector)> = Vec::with_capacity(projected.len() + 1);
    for p in &projected {
        while hull.len() >= 2 && !turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) {
            hull.pop();
        }
        hull.push(*p);
    }
    let lower_len = hull.len() + 1;
    for p in projected.iter().rev().skip(1) {
        while hull.len() >= lower_len && !turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();

    let mut vertices: Vec<Vector> = Vec::with_capacity(hull.len());
    for (_, _, v) in hull {
        if vertices.last().is_none_or(|last: &Vector| last.cross(&v).norm_squared() >= CROSS_N2MIN) {
            vertices.push(v);
        }
    }
    while vertices.len() > 1
        && vertices
            .first()
            .zip(vertices.last())
            .is_some_and(|(f, l)| f.cross(l).norm_squared() < CROSS_N2MIN)
    {
        vertices.pop();
    }
    if vertices.len() < 3 {
        debug!(vertices = vertices.len(), "hull is degenerate");
        return None;
    }

    let start = vertices
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| cmp_vectors(a, b))
        .map_or(0, |(i, _)| i);
    vertices.rotate_left(start);
    debug!(vertices = vertices.len(), "convex hull built");
    SphericalConvexPolygon::new(vertices).ok()
}

/// Checks an ordered vertex loop, returning `(is_valid, is_counter_clockwise)`.
///
/// A loop is valid when it has at least three distinct vertices, every turn
/// bends the same way, and it winds exactly once around its centroid. The
/// winding check rejects star polygons, whose turns all agree but which
/// circle the centre twice. Orientation is as seen from outside the sphere
/// and is only meaningful for valid loops.
pub fn convex(points: &[Vector]) -> (bool, bool) {
    const INVALID: (bool, bool) = (false, false);
    let n = points.len();
    if n < 3 {
        return INVALID;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (&points[i], &points[j]);
            if a.cross(b).norm_squared() < CROSS_N2MIN && a.dot(b) > 0.0 {
                return INVALID;
            }
        }
    }

    let mut sign = 0.0;
    for i in 0..n {
        let prev = &points[(i + n - 1) % n];
        let cur = &points[i];
        let next = &points[(i + 1) % n];
        let s = prev.triple(cur, next);
        if s == 0.0 || (sign != 0.0 && s.signum() != sign) {
            return INVALID;
        }
        sign = s.signum();
    }

    let sum = points.iter().fold(Vector::ZERO, |acc, p| acc + *p);
    let Ok(c) = sum.normalize() else {
        return INVALID;
    };
    if points.iter().any(|p| p.dot(&c) <= 0.0) {
        return INVALID;
    }
    let (north, east) = north_east(&c);
    let angle = |p: &Vector| p.dot(&north).atan2(p.dot(&east));
    let mut winding = 0.0;
    for i in 0..n {
        let mut step = angle(&points[(i + 1) % n]) - angle(&points[i]);
        if step > PI {
            step -= TAU;
        } else if step <= -PI {
            step += TAU;
        }
        winding += step;
    }
    if (winding - sign * TAU).abs() > 1e-6 {
        return INVALID;
    }
    (true, sign > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::cartesian_unit_vector;
    use crate::region::SphericalRegion;
    use approx::assert_abs_diff_eq;

    fn v(lon: f64, lat: f64) -> Vector {
        cartesian_unit_vector((lon, lat))
    }

    #[test]
    fn closest_point_cases() {
        let (p, s) = closest_on_segment(Vector::new(1.0, -1.0, 0.0), Vector::new(1.0, 1.0, 0.0));
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-15);
        assert_eq!(s.len(), 2);

        let (p, s) = closest_on_triangle(
            Vector::new(1.0, -1.0, -1.0),
            Vector::new(1.0, 1.0, -1.0),
            Vector::new(1.0, 0.0, 1.0),
        );
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-15);
        assert_eq!(s.len(), 3);

        let (p, _) = closest_on_tetrahedron(
            Vector::new(1.0, 0.0, -1.0),
            Vector::new(-1.0, 1.0, -1.0),
            Vector::new(-1.0, -1.0, -1.0),
            Vector::new(0.0, 0.0, 1.0),
        );
        assert_eq!(p, Vector::ZERO);
    }

    #[test]
    fn hemispherical_basics() {
        assert!(!hemispherical(&[]));
        assert!(hemispherical(&[Vector::X]));
        assert!(!hemispherical(&[Vector::X, -Vector::X]));
        assert!(hemispherical(&[Vector::X, Vector::Y, Vector::Z]));
        assert!(!hemispherical(&[Vector::X, Vector::Y, Vector::Z, -(Vector::X + Vector::Y + Vector::Z)]));
        // Four points on the equator circle the pole from every side.
        assert!(!hemispherical(&[v(0.0, 0.0), v(90.0, 0.0), v(180.0, 0.0), v(270.0, 0.0)]));
    }

    #[test]
    fn hull_of_square_with_interior_points() {
        let mut pts = vec![v(-5.0, -5.0), v(5.0, -5.0), v(5.0, 5.0), v(-5.0, 5.0)];
        pts.extend([v(0.0, 0.0), v(1.0, 2.0), v(-3.0, 1.0), v(5.0, -5.0)]);
        let hull = convex_hull(&pts).unwrap();
        assert_eq!(hull.vertices().len(), 4);
        for p in &pts {
            assert!(hull.contains_point(p));
        }
        assert!(convex(hull.vertices()).0);
        assert!(convex(hull.vertices()).1);
    }

    #[test]
    fn hull_drops_points_on_edges() {
        let pts = [v(0.0, 0.0), v(10.0, 0.0), v(5.0, 0.0), v(5.0, 8.0)];
        let hull = convex_hull(&pts).unwrap();
        assert_eq!(hull.vertices().len(), 3);
    }

    #[test]
    fn hull_rejects_degenerate_input() {
        assert!(convex_hull(&[v(0.0, 0.0), v(10.0, 0.0)]).is_none());
        assert!(convex_hull(&[v(0.0, 0.0), v(5.0, 0.0), v(10.0, 0.0)]).is_none());
        assert!(convex_hull(&[Vector::X, -Vector::X, Vector::Y]).is_none());
    }

    #[test]
    fn convex_orientation() {
        let ccw = [v(0.0, 0.0), v(10.0, 0.0), v(10.0, 10.0), v(0.0, 10.0)];
        assert_eq!(convex(&ccw), (true, true));
        let mut cw = ccw;
        cw.reverse();
        assert_eq!(convex(&cw), (true, false));
    }

    #[test]
    fn convex_rejects_bad_loops() {
        assert_eq!(convex(&[v(0.0, 0.0), v(1.0, 0.0)]), (false, false));
        let dup = [v(0.0, 0.0), v(10.0, 0.0), v(10.0, 0.0), v(0.0, 10.0)];
        assert!(!convex(&dup).0);
        // Bow tie: the loop crosses itself.
        let bow = [v(0.0, 0.0), v(10.0, 10.0), v(10.0, 0.0), v(0.0, 10.0)];
        assert!(!convex(&bow).0);
        // Pentagram: every turn agrees but the loop winds twice.
        let star: Vec<Vector> = (0..5).map(|i| v(f64::from(i * 144), 80.0)).collect();
        assert!(!convex(&star).0);
    }
}
