//! One-dimensional extremum search used where a closed form is not available
//! (ellipse boundaries against parallels and circles).

const SAMPLES: usize = 64;
const REFINE_STEPS: usize = 80;
const INV_GOLDEN: f64 = 0.618_033_988_749_894_9;

/// Maximum of a smooth function on `[lo, hi]`.
///
/// The interval is sampled uniformly and the best sample's neighbourhood is
/// refined by golden-section search, so `f` only needs to be unimodal at the
/// sampling resolution.
pub(crate) fn maximize(f: impl Fn(f64) -> f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return f(lo);
    }
    let step = (hi - lo) / SAMPLES as f64;
    let mut best_i = 0;
    let mut best = f(lo);
    for i in 1..=SAMPLES {
        let v = f(lo + i as f64 * step);
        if v > best {
            best = v;
            best_i = i;
        }
    }

    let mut a = lo + best_i.saturating_sub(1) as f64 * step;
    let mut b = (lo + (best_i + 1) as f64 * step).min(hi);
    let mut c = b - INV_GOLDEN * (b - a);
    let mut d = a + INV_GOLDEN * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);
    for _ in 0..REFINE_STEPS {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_GOLDEN * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_GOLDEN * (b - a);
            fd = f(d);
        }
    }
    best.max(fc).max(fd)
}

/// Minimum of a smooth function on `[lo, hi]`; see [`maximize`].
pub(crate) fn minimize(f: impl Fn(f64) -> f64, lo: f64, hi: f64) -> f64 {
    -maximize(|t| -f(t), lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::TAU;

    #[test]
    fn finds_interior_peak() {
        let m = maximize(|t| -(t - 0.3721).powi(2) + 2.0, 0.0, 1.0);
        assert_abs_diff_eq!(m, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn finds_periodic_extremes() {
        assert_abs_diff_eq!(maximize(|t| (t - 1.0).cos(), 0.0, TAU), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(minimize(|t| (t - 1.0).cos(), 0.0, TAU), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn endpoint_maximum() {
        assert_abs_diff_eq!(maximize(|t| t, -1.0, 4.0), 4.0, epsilon = 1e-12);
    }
}
