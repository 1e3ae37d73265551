//! Products and ratios of two independent normal variables.
//!
//! Draws paired samples from N(m1, s1) and N(m2, s2) and summarises the
//! marginals, their ratio `x2 / x1` and their product `x2 · x1`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SierraError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalPair {
    pub mean_1: f64,
    pub sd_1: f64,
    pub mean_2: f64,
    pub sd_2: f64,
}

impl Default for NormalPair {
    fn default() -> Self {
        Self {
            mean_1: 5.0,
            sd_1: 1.0,
            mean_2: 15.0,
            sd_2: 2.0,
        }
    }
}

/// Default number of draws.
pub const DEFAULT_SAMPLES: usize = 10_000;

/// Sorted samples of the two marginals and of their ratio and product.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub params: NormalPair,
    pub first: Vec<f64>,
    pub second: Vec<f64>,
    pub ratio: Vec<f64>,
    pub product: Vec<f64>,
}

pub fn simulate(params: NormalPair, samples: usize, seed: u64) -> Result<Simulation> {
    if samples == 0 {
        return Err(SierraError::InvalidInput("sample count must be positive".into()));
    }
    let dist = |mean: f64, sd: f64| {
        if !(sd.is_finite() && sd >= 0.0) {
            return Err(SierraError::InvalidInput(format!(
                "standard deviation {sd} must be finite and non-negative"
            )));
        }
        Normal::new(mean, sd)
            .map_err(|e| SierraError::InvalidInput(format!("N({mean}, {sd}): {e}")))
    };
    let d1 = dist(params.mean_1, params.sd_1)?;
    let d2 = dist(params.mean_2, params.sd_2)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut first = Vec::with_capacity(samples);
    let mut second = Vec::with_capacity(samples);
    for _ in 0..samples {
        first.push(d1.sample(&mut rng));
        second.push(d2.sample(&mut rng));
    }

    let mut ratio: Vec<f64> = first.iter().zip(&second).map(|(a, b)| b / a).collect();
    let mut product: Vec<f64> = first.iter().zip(&second).map(|(a, b)| b * a).collect();
    for v in [&mut first, &mut second, &mut ratio, &mut product] {
        v.sort_by(f64::total_cmp);
    }

    Ok(Simulation {
        params,
        first,
        second,
        ratio,
        product,
    })
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub mean: f64,
    /// Sample standard deviation (n − 1 denominator).
    pub sd: f64,
    sorted: Vec<f64>,
}

impl Summary {
    /// Summarise the finite values of `values`; `None` when there are none.
    pub fn new(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let sd = if sorted.len() > 1 {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        Some(Self { mean, sd, sorted })
    }

    /// Quantile with linear interpolation between order statistics.
    pub fn quantile(&self, q: f64) -> f64 {
        let q = q.clamp(0.0, 1.0);
        let pos = q * (self.sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let frac = pos - lo as f64;
        self.sorted[lo] + (self.sorted[hi] - self.sorted[lo]) * frac
    }

    /// Legend text: `Mean=…, SD=… (q05, q95)` or with the median when
    /// `with_median` is set.
    pub fn legend(&self, with_median: bool) -> String {
        let q05 = self.quantile(0.05);
        let q95 = self.quantile(0.95);
        if with_median {
            format!(
                "Mean={:.2}, SD={:.2} ({:.2}, {:.2}, {:.2})",
                self.mean,
                self.sd,
                q05,
                self.quantile(0.5),
                q95
            )
        } else {
            format!("Mean={:.2}, SD={:.2} ({:.2}, {:.2})", self.mean, self.sd, q05, q95)
        }
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Equal-width bins over the finite range of `values`.
    pub fn new(values: &[f64], bins: usize) -> Option<Self> {
        let bins = bins.max(1);
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() {
            return None;
        }
        let span = if max > min { max - min } else { 1.0 };
        let bin_width = span / bins as f64;
        let mut counts = vec![0; bins];
        for v in values.iter().copied().filter(|v| v.is_finite()) {
            let idx = (((v - min) / bin_width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Some(Self {
            min,
            bin_width,
            counts,
        })
    }

    pub fn bin_edges(&self, bin: usize) -> (f64, f64) {
        let start = self.min + bin as f64 * self.bin_width;
        (start, start + self.bin_width)
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Bin count used for a sample of `n` values: one bin per 50 draws.
pub fn default_bins(n: usize) -> usize {
    (n / 50).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn simulation_is_seeded_and_sorted() {
        let a = simulate(NormalPair::default(), 2_000, 7).unwrap();
        let b = simulate(NormalPair::default(), 2_000, 7).unwrap();
        assert_eq!(a.ratio, b.ratio);
        assert!(a.product.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(a.first.len(), 2_000);
    }

    #[test]
    fn marginal_moments_are_close() {
        let sim = simulate(NormalPair::default(), DEFAULT_SAMPLES, 42).unwrap();
        let s1 = Summary::new(&sim.first).unwrap();
        let s2 = Summary::new(&sim.second).unwrap();
        assert_abs_diff_eq!(s1.mean, 5.0, epsilon = 0.1);
        assert_abs_diff_eq!(s1.sd, 1.0, epsilon = 0.1);
        assert_abs_diff_eq!(s2.mean, 15.0, epsilon = 0.1);
        assert_abs_diff_eq!(s2.sd, 2.0, epsilon = 0.1);
        // E[x1·x2] = m1·m2 for independent draws
        let prod = Summary::new(&sim.product).unwrap();
        assert_abs_diff_eq!(prod.mean, 75.0, epsilon = 2.0);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let bad = NormalPair {
            sd_1: -1.0,
            ..NormalPair::default()
        };
        assert!(matches!(simulate(bad, 10, 0), Err(SierraError::InvalidInput(_))));
        let bad = NormalPair {
            sd_2: f64::NAN,
            ..NormalPair::default()
        };
        assert!(simulate(bad, 10, 0).is_err());
        assert!(simulate(NormalPair::default(), 0, 0).is_err());

        let degenerate = NormalPair {
            sd_1: 0.0,
            ..NormalPair::default()
        };
        let sim = simulate(degenerate, 10, 0).unwrap();
        assert!(sim.first.iter().all(|&v| v == 5.0));
    }

    #[test]
    fn quantiles_interpolate() {
        let s = Summary::new(&[4.0, 1.0, 3.0, 2.0, f64::NAN]).unwrap();
        assert_eq!(s.quantile(0.0), 1.0);
        assert_eq!(s.quantile(1.0), 4.0);
        assert_abs_diff_eq!(s.quantile(0.5), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s.mean, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s.sd, (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert!(s.legend(true).starts_with("Mean=2.50, SD=1.29 ("));
    }

    #[test]
    fn histogram_counts_every_finite_value() {
        let values = [0.0, 0.1, 0.5, 0.99, 1.0, f64::INFINITY];
        let h = Histogram::new(&values, 2).unwrap();
        assert_eq!(h.counts, vec![2, 3]);
        assert_eq!(h.total(), 5);
        assert_eq!(h.bin_edges(1), (0.5, 1.0));
        assert!(Histogram::new(&[f64::NAN], 4).is_none());
    }

    #[test]
    fn default_bins_follow_sample_size() {
        assert_eq!(default_bins(DEFAULT_SAMPLES), 200);
        assert_eq!(default_bins(10), 1);
    }
}
