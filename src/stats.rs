use statrs::distribution::{Continuous, Normal};
use statrs::function::erf::{erf, erf_inv};

/// z-value of the reported 95 % interval used to back out an implied
/// standard deviation from an upper confidence limit.
pub const REPORTED_Z: f64 = 1.96;

/// Two-sided standard-normal quantile for `coverage`:
/// Φ⁻¹((1 + coverage) / 2), written as √2·erf⁻¹(coverage).
pub fn two_sided_z(coverage: f64) -> f64 {
    std::f64::consts::SQRT_2 * erf_inv(coverage)
}

/// Two-sided coverage of ±`sigmas` standard deviations.
pub fn coverage_for_sigmas(sigmas: f64) -> f64 {
    erf(sigmas / std::f64::consts::SQRT_2)
}

/// Implied standard deviation of a reported 95 % interval.
pub fn implied_scale(estimate: f64, upper_bound: f64) -> f64 {
    (upper_bound - estimate) / REPORTED_Z
}

/// Normal density at `x`, or `None` when `location`/`scale` do not describe
/// a proper normal distribution.
pub fn normal_pdf(x: f64, location: f64, scale: f64) -> Option<f64> {
    if !(scale.is_finite() && scale > 0.0) {
        return None;
    }
    Normal::new(location, scale).ok().map(|n| n.pdf(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn z_for_95_percent() {
        assert_abs_diff_eq!(two_sided_z(0.95), 1.959964, epsilon = 1e-5);
    }

    #[test]
    fn z_for_one_sigma_coverage() {
        assert_abs_diff_eq!(two_sided_z(0.682689492137086), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn coverage_matches_tabulated_values() {
        assert_abs_diff_eq!(coverage_for_sigmas(2.0), 0.954499736103642, epsilon = 1e-9);
        assert_abs_diff_eq!(coverage_for_sigmas(0.5), 0.382924922548026, epsilon = 1e-9);
    }

    #[test]
    fn implied_scale_from_ucl() {
        assert_abs_diff_eq!(implied_scale(0.1, 0.296), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn pdf_rejects_degenerate_scale() {
        assert!(normal_pdf(0.0, 0.0, 0.0).is_none());
        assert!(normal_pdf(0.0, 0.0, -1.0).is_none());
        assert!(normal_pdf(0.0, 0.0, f64::NAN).is_none());
        let peak = normal_pdf(0.0, 0.0, 1.0).unwrap();
        assert_abs_diff_eq!(peak, 0.398942280, epsilon = 1e-8);
    }
}
