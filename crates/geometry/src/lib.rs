//! Spherical geometry on the celestial sphere: coordinate conversion, the
//! four region kinds with their containment and intersection predicates,
//! and hull construction for ad-hoc query regions.
//!
//! Angles are in degrees unless a name says otherwise (ellipse axes are in
//! arcseconds).

pub mod constants;
pub mod coords;
pub mod error;
pub mod hull;
mod numeric;
pub mod region;
pub mod select;
pub mod vector;

// Re-export the working set at the crate root.
pub use coords::{
    Coords, alpha, cartesian_angular_sep, cartesian_unit_vector, clamp_phi, max_alpha, north_east, reduce_lon,
    spherical_angular_sep, spherical_coords,
};
pub use error::{GeometryError, Result};
pub use hull::{convex, convex_hull, hemispherical};
pub use region::{Region, SphericalBox, SphericalCircle, SphericalConvexPolygon, SphericalEllipse, SphericalRegion};
pub use select::{median, select_kth};
pub use vector::{Vector, cross, dot, normalize};
