//! Process-wide numeric constants.

/// Degrees per arcsecond.
pub const DEG_PER_ARCSEC: f64 = 1.0 / 3600.0;

/// Arcseconds per degree.
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Margin (degrees) added to containment tests and bounding boxes so that
/// boundary points are inside by construction rather than by rounding luck.
/// One milliarcsecond.
pub const ANGLE_EPSILON: f64 = 0.001 * DEG_PER_ARCSEC;

/// Latitudes within this many degrees of +/-90 are treated as the pole.
pub const POLE_EPSILON: f64 = 1.0 * DEG_PER_ARCSEC;

/// Minimum squared norm of a cross product for the two inputs to count as
/// distinct, non-antipodal directions.
pub const CROSS_N2MIN: f64 = 2e-23;

/// Largest permitted ellipse semi-major axis, in arcseconds (10 degrees).
pub const MAX_ELLIPSE_SEMI_MAJOR_ARCSEC: f64 = 10.0 * ARCSEC_PER_DEG;
