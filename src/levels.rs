use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SierraError};
use crate::stats;

// ---------------------------------------------------------------------------
// ConfidenceLevel – two-sided coverage in (0, 1)
// ---------------------------------------------------------------------------

/// Coverage of 5, 4, 3, 2, 1 and 0.5 standard deviations, outermost first.
pub const DEFAULT_LEVELS: [f64; 6] = [
    0.999999426696856,
    0.999936657516334,
    0.997300203936740,
    0.954499736103642,
    0.682689492137086,
    0.382924922548026,
];

/// Lowest fill opacity any band receives.
pub const MIN_OPACITY: f64 = 0.1;

/// A validated two-sided coverage probability, strictly inside (0, 1).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    pub fn new(coverage: f64) -> Result<Self> {
        if coverage > 0.0 && coverage < 1.0 {
            Ok(Self(coverage))
        } else {
            Err(SierraError::InvalidInput(format!(
                "confidence level {coverage} is outside (0, 1)"
            )))
        }
    }

    /// Level covering ±`sigmas` standard deviations of a normal.
    pub fn from_sigmas(sigmas: f64) -> Result<Self> {
        if !(sigmas.is_finite() && sigmas > 0.0) {
            return Err(SierraError::InvalidInput(format!(
                "sigma multiple {sigmas} must be positive"
            )));
        }
        Self::new(stats::coverage_for_sigmas(sigmas))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Standard-normal half-width multiplier for this coverage.
    pub fn z_score(self) -> f64 {
        stats::two_sided_z(self.0)
    }

    /// Fill opacity of the band drawn at this level: `1.1 − level`,
    /// never below [`MIN_OPACITY`].
    pub fn opacity(self) -> f64 {
        (1.1 - self.0).clamp(MIN_OPACITY, 1.0)
    }
}

impl TryFrom<f64> for ConfidenceLevel {
    type Error = SierraError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ConfidenceLevel> for f64 {
    fn from(level: ConfidenceLevel) -> f64 {
        level.0
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = self.0 * 100.0;
        if pct >= 99.99 {
            write!(f, "{pct:.5}%")
        } else {
            write!(f, "{pct:.1}%")
        }
    }
}

/// The default level set, in drawing order.
pub fn default_levels() -> Vec<ConfidenceLevel> {
    DEFAULT_LEVELS.iter().map(|&v| ConfidenceLevel(v)).collect()
}

/// Validate raw levels and put them in drawing order: widest coverage first,
/// so narrower, more opaque bands composite on top. Duplicates are dropped.
pub fn drawing_order(raw: &[f64]) -> Result<Vec<ConfidenceLevel>> {
    let mut levels = raw
        .iter()
        .map(|&v| ConfidenceLevel::new(v))
        .collect::<Result<Vec<_>>>()?;
    levels.sort_by(|a, b| b.0.total_cmp(&a.0));
    levels.dedup();
    Ok(levels)
}
