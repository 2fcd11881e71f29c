use serde::{Deserialize, Serialize};

use super::arc::{meridian_crossings, min_sep_to_arc, on_arc, parallel_crossings};
use super::circle::SphericalCircle;
use super::ellipse::SphericalEllipse;
use super::spherical_box::SphericalBox;
use super::SphericalRegion;
use crate::constants::{ANGLE_EPSILON, CROSS_N2MIN};
use crate::coords::{Coords, cartesian_angular_sep, cartesian_unit_vector, spherical_coords};
use crate::error::{GeometryError, Result};
use crate::vector::Vector;

/// `ANGLE_EPSILON` expressed as a dot product against a unit plane normal.
pub(crate) const DOT_SLACK: f64 = ANGLE_EPSILON * std::f64::consts::PI / 180.0;

/// A convex polygon whose edges are great-circle arcs.
///
/// Vertices run counter-clockwise as seen from outside the sphere. Edge `i`
/// joins vertex `i` to vertex `i + 1` and is described by the unit normal of
/// its plane, oriented toward the polygon's interior, so a point is inside
/// when it is on the non-negative side of every edge plane.
///
/// Convexity is assumed, not verified; use [`crate::hull::convex`] or
/// [`crate::hull::convex_hull`] when the vertex loop is untrusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphericalConvexPolygon {
    vertices: Vec<Vector>,
    edges: Vec<Vector>,
    bbox: SphericalBox,
}

impl SphericalConvexPolygon {
    /// Builds the polygon from its vertex loop, deriving each edge plane as
    /// `v[i] x v[i + 1]`.
    pub fn new<I, C>(vertices: I) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<Coords>,
    {
        let vertices = unit_vertices(vertices)?;
        let n = vertices.len();
        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let e = vertices[i].cross(&vertices[(i + 1) % n]);
            if e.norm_squared() < CROSS_N2MIN {
                return Err(GeometryError::invalid(format!(
                    "polygon edge {i} joins coincident or antipodal vertices"
                )));
            }
            edges.push(e.normalize()?);
        }
        Ok(Self::assemble(vertices, edges))
    }

    /// Builds the polygon from a vertex loop and explicitly supplied edge
    /// plane normals, which must point toward the interior.
    pub fn with_edges<I, C>(vertices: I, edges: Vec<Vector>) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<Coords>,
    {
        let vertices = unit_vertices(vertices)?;
        if edges.len() != vertices.len() {
            return Err(GeometryError::invalid(format!(
                "polygon has {} vertices but {} edges",
                vertices.len(),
                edges.len()
            )));
        }
        let edges = edges.iter().map(Vector::normalize).collect::<Result<Vec<_>>>()?;
        Ok(Self::assemble(vertices, edges))
    }

    fn assemble(vertices: Vec<Vector>, edges: Vec<Vector>) -> Self {
        let mut polygon = Self {
            vertices,
            edges,
            bbox: SphericalBox::empty(),
        };
        polygon.bbox = polygon.compute_bounding_box();
        polygon
    }

    /// Union of the edge boxes, widened to every longitude when the polygon
    /// encloses a pole.
    fn compute_bounding_box(&self) -> SphericalBox {
        let mut bbox = SphericalBox::empty();
        for (i, n) in self.edges.iter().enumerate() {
            let (v1, v2) = self.edge_endpoints(i);
            bbox.extend(&SphericalBox::edge(v1, v2, n));
        }
        if self.contains_point(Vector::Z) {
            bbox = SphericalBox::from_raw(0.0, 360.0, bbox.lat_min(), 90.0);
        }
        if self.contains_point(-Vector::Z) {
            bbox = SphericalBox::from_raw(0.0, 360.0, -90.0, bbox.lat_max());
        }
        bbox
    }

    pub fn vertices(&self) -> &[Vector] {
        &self.vertices
    }

    /// Inward-facing unit normals of the edge planes.
    pub fn edges(&self) -> &[Vector] {
        &self.edges
    }

    fn edge_endpoints(&self, i: usize) -> (&Vector, &Vector) {
        (&self.vertices[i], &self.vertices[(i + 1) % self.vertices.len()])
    }

    /// Minimum angular distance (degrees) from `p` to the polygon; zero
    /// inside.
    pub(crate) fn min_sep(&self, p: &Vector) -> f64 {
        if self.contains_point(p) {
            return 0.0;
        }
        self.edges
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let (v1, v2) = self.edge_endpoints(i);
                min_sep_to_arc(p, v1, v2, n)
            })
            .fold(f64::INFINITY, f64::min)
    }

    pub fn contains_box(&self, b: &SphericalBox) -> bool {
        if b.is_empty() || !self.bbox.contains_box(b) {
            return false;
        }
        if !b.corners().iter().all(|c| self.contains_point(c)) {
            return false;
        }
        // Meridian edges are great-circle arcs between contained corners, so
        // only the two bounding parallels can leave an edge plane.
        self.edges.iter().all(|n| {
            [b.lat_min(), b.lat_max()]
                .iter()
                .all(|&lat| min_dot_on_parallel(n, lat, b) >= -DOT_SLACK)
        })
    }

    pub fn contains_circle(&self, c: &SphericalCircle) -> bool {
        if c.radius() >= 90.0 || !self.contains_point(c.center()) {
            return false;
        }
        let min_dot = c.radius().to_radians().sin();
        self.edges.iter().all(|n| n.dot(c.center()) >= min_dot - DOT_SLACK)
    }

    pub fn contains_ellipse(&self, e: &SphericalEllipse) -> bool {
        self.edges.iter().all(|n| {
            let (center_dot, half_width) = e.plane_extent(n);
            center_dot - half_width >= -DOT_SLACK
        })
    }

    pub fn contains_polygon(&self, other: &SphericalConvexPolygon) -> bool {
        other.vertices.iter().all(|v| self.contains_point(v))
    }

    pub fn intersects_box(&self, b: &SphericalBox) -> bool {
        if b.is_empty() || !self.bbox.intersects_box(b) {
            return false;
        }
        if self.vertices.iter().any(|v| b.contains_point(v)) {
            return true;
        }
        if b.corners().iter().any(|c| self.contains_point(c)) {
            return true;
        }
        // Neither holds a point of the other, so they meet only if an edge
        // crosses the box boundary.
        for (i, n) in self.edges.iter().enumerate() {
            let (v1, v2) = self.edge_endpoints(i);
            for lat in [b.lat_min(), b.lat_max()] {
                if parallel_crossings(n, lat)
                    .iter()
                    .any(|p| on_arc(v1, v2, n, p) && b.lon_in_range(spherical_coords(*p).0))
                {
                    return true;
                }
            }
            if b.is_full_lon() {
                continue;
            }
            for lon in [b.lon_min(), b.lon_max()] {
                if meridian_crossings(n, lon).iter().any(|p| {
                    let lat = spherical_coords(*p).1;
                    on_arc(v1, v2, n, p) && b.lat_min() <= lat && lat <= b.lat_max()
                }) {
                    return true;
                }
            }
        }
        false
    }

    pub fn intersects_circle(&self, c: &SphericalCircle) -> bool {
        self.min_sep(c.center()) <= c.radius()
    }

    /// Disjoint when one edge plane has the whole ellipse on its outer
    /// side; otherwise decided by the bounding circle, which may
    /// over-report.
    pub fn intersects_ellipse(&self, e: &SphericalEllipse) -> bool {
        let separated = self.edges.iter().any(|n| {
            let (center_dot, half_width) = e.plane_extent(n);
            center_dot + half_width < -DOT_SLACK
        });
        !separated && self.intersects_circle(&e.bounding_circle())
    }

    /// Separating-edge test over both polygons' edge planes.
    pub fn intersects_polygon(&self, other: &SphericalConvexPolygon) -> bool {
        if !self.bbox.intersects_box(&other.bbox) {
            return false;
        }
        let separates = |n: &Vector, points: &[Vector]| points.iter().all(|v| n.dot(v) < -DOT_SLACK);
        let split = self.edges.iter().any(|n| separates(n, &other.vertices))
            || other.edges.iter().any(|n| separates(n, &self.vertices));
        !split
    }
}

impl SphericalRegion for SphericalConvexPolygon {
    fn bounding_box(&self) -> SphericalBox {
        self.bbox
    }

    /// Centred on the normalized vertex sum. Falls back to the whole sphere
    /// when no cap of at most a hemisphere around that centre holds every
    /// vertex.
    fn bounding_circle(&self) -> SphericalCircle {
        let sum = self.vertices.iter().fold(Vector::ZERO, |acc, v| acc + *v);
        let Ok(center) = sum.normalize() else {
            return SphericalCircle::from_parts(Vector::Z, 180.0);
        };
        let radius = self
            .vertices
            .iter()
            .map(|v| cartesian_angular_sep(&center, v))
            .fold(0.0, f64::max)
            + ANGLE_EPSILON;
        if radius > 90.0 {
            SphericalCircle::from_parts(center, 180.0)
        } else {
            SphericalCircle::from_parts(center, radius)
        }
    }

    fn contains_point(&self, point: impl Into<Coords>) -> bool {
        let p = cartesian_unit_vector(point);
        self.edges.iter().all(|n| n.dot(&p) >= -DOT_SLACK)
    }
}

fn unit_vertices<I, C>(vertices: I) -> Result<Vec<Vector>>
where
    I: IntoIterator<Item = C>,
    C: Into<Coords>,
{
    let vertices = vertices
        .into_iter()
        .map(|c| cartesian_unit_vector(c).normalize())
        .collect::<Result<Vec<_>>>()?;
    if vertices.len() < 3 {
        return Err(GeometryError::invalid(format!(
            "polygon needs at least 3 vertices, got {}",
            vertices.len()
        )));
    }
    Ok(vertices)
}

/// Smallest `n . v` over the points `v` of the parallel at `lat` inside the
/// longitude range of `b`.
///
/// On the parallel, `n . v = cos(lat) * A * cos(lon - lon_n) + n.z * sin(lat)`
/// with `A` the horizontal length of `n` and `lon_n` its longitude, so the
/// minimum sits at `lon_n + 180` when that longitude is in range and at an
/// end of the range otherwise.
fn min_dot_on_parallel(n: &Vector, lat: f64, b: &SphericalBox) -> f64 {
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let a = n.x.hypot(n.y);
    let lon_n = n.y.atan2(n.x).to_degrees();
    let min_cos = if b.lon_in_range(lon_n + 180.0) {
        -1.0
    } else {
        (b.lon_min() - lon_n).to_radians().cos().min((b.lon_max() - lon_n).to_radians().cos())
    };
    cos_lat * a * min_cos + n.z * sin_lat
}
