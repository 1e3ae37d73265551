//! Interval estimators.
//!
//! An estimator turns a confidence level, a point estimate and the implied
//! standard deviation of a reported 95 % interval into the two-sided
//! quantile interval at that level.
//!
//! ```text
//!  additive:        location ± z(level)·scale
//!  multiplicative:  exp(ln location ± z(level)·sd_ln)
//!                   sd_ln = (ln(location + 1.96·scale) − ln location) / 1.96
//! ```
//!
//! Undefined bounds are replaced by a neutral value (0 for additive, 1 for
//! multiplicative) unless the [`FallbackPolicy`] is `Strict`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SierraError};
use crate::levels::ConfidenceLevel;
use crate::stats::REPORTED_Z;

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// Lower/upper quantile pair at one confidence level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    /// Build an interval, replacing each non-finite bound by `fallback`.
    pub fn or_fallback(lower: f64, upper: f64, fallback: f64) -> Self {
        let fix = |v: f64| if v.is_finite() { v } else { fallback };
        Self {
            lower: fix(lower),
            upper: fix(upper),
        }
    }

    pub fn point(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

// ---------------------------------------------------------------------------
// Policies and estimator selection
// ---------------------------------------------------------------------------

/// What to do with records whose bounds come out undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Replace undefined bounds by the estimator's neutral value.
    #[default]
    Substitute,
    /// Reject negative scales and non-positive log-domain locations.
    Strict,
}

/// Which estimator a plot uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimatorKind {
    /// Normal interval for risk differences.
    #[default]
    Additive,
    /// Log-normal interval for risk ratios.
    Multiplicative,
}

impl EstimatorKind {
    pub fn build(self, policy: FallbackPolicy) -> Box<dyn IntervalEstimator> {
        match self {
            EstimatorKind::Additive => Box::new(Additive::new(policy)),
            EstimatorKind::Multiplicative => Box::new(Multiplicative::new(policy)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EstimatorKind::Additive => "Additive (normal)",
            EstimatorKind::Multiplicative => "Multiplicative (log-normal)",
        }
    }
}

// ---------------------------------------------------------------------------
// IntervalEstimator trait
// ---------------------------------------------------------------------------

pub trait IntervalEstimator {
    /// Neutral value substituted for undefined bounds.
    fn fallback(&self) -> f64;

    /// Interval at an already validated level.
    fn interval_at(&self, level: ConfidenceLevel, location: f64, scale: f64) -> Result<Interval>;

    /// Interval at a raw coverage probability; fails with
    /// [`SierraError::InvalidInput`] when `query` is outside (0, 1).
    fn interval(&self, query: f64, location: f64, scale: f64) -> Result<Interval> {
        self.interval_at(ConfidenceLevel::new(query)?, location, scale)
    }
}

fn reject(policy: FallbackPolicy, message: impl FnOnce() -> String) -> Result<()> {
    match policy {
        FallbackPolicy::Substitute => Ok(()),
        FallbackPolicy::Strict => Err(SierraError::InvalidInput(message())),
    }
}

/// Normal interval around the location.
#[derive(Debug, Clone, Copy, Default)]
pub struct Additive {
    policy: FallbackPolicy,
}

impl Additive {
    pub const FALLBACK: f64 = 0.0;

    pub fn new(policy: FallbackPolicy) -> Self {
        Self { policy }
    }
}

impl IntervalEstimator for Additive {
    fn fallback(&self) -> f64 {
        Self::FALLBACK
    }

    fn interval_at(&self, level: ConfidenceLevel, location: f64, scale: f64) -> Result<Interval> {
        if scale < 0.0 || !scale.is_finite() || !location.is_finite() {
            reject(self.policy, || {
                format!("scale {scale} / location {location} do not define a normal interval")
            })?;
            log::debug!("degenerate record (location={location}, scale={scale}), using fallback");
            return Ok(Interval::point(Self::FALLBACK));
        }
        if scale == 0.0 {
            return Ok(match self.policy {
                FallbackPolicy::Substitute => Interval::point(Self::FALLBACK),
                FallbackPolicy::Strict => Interval::point(location),
            });
        }

        let half = level.z_score() * scale;
        Ok(Interval::or_fallback(
            location - half,
            location + half,
            Self::FALLBACK,
        ))
    }
}

/// Log-normal interval: the location is exponentiated from log-space, with
/// the log-space spread recovered from the reported upper limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Multiplicative {
    policy: FallbackPolicy,
}

impl Multiplicative {
    pub const FALLBACK: f64 = 1.0;

    pub fn new(policy: FallbackPolicy) -> Self {
        Self { policy }
    }
}

impl IntervalEstimator for Multiplicative {
    fn fallback(&self) -> f64 {
        Self::FALLBACK
    }

    fn interval_at(&self, level: ConfidenceLevel, location: f64, scale: f64) -> Result<Interval> {
        if !(location > 0.0 && location.is_finite()) || !(scale >= 0.0 && scale.is_finite()) {
            reject(self.policy, || {
                format!("log-normal interval needs location > 0 and scale ≥ 0 (got {location}, {scale})")
            })?;
        }

        let ucl = location + REPORTED_Z * scale;
        let loc_ln = location.ln();
        let sd_ln = (ucl.ln() - loc_ln) / REPORTED_Z;

        if sd_ln == 0.0 && loc_ln.is_finite() && self.policy == FallbackPolicy::Strict {
            return Ok(Interval::point(location));
        }
        if !(sd_ln.is_finite() && sd_ln > 0.0 && loc_ln.is_finite()) {
            log::debug!("degenerate record (location={location}, scale={scale}), using fallback");
            return Ok(Interval::point(Self::FALLBACK));
        }

        let half = level.z_score() * sd_ln;
        Ok(Interval::or_fallback(
            (loc_ln - half).exp(),
            (loc_ln + half).exp(),
            Self::FALLBACK,
        ))
    }
}
