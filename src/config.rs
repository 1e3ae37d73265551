use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::color::Colormap;
use crate::data::model::ColumnMapping;
use crate::error::{Result, SierraError};
use crate::estimator::{EstimatorKind, FallbackPolicy};
use crate::levels::{self, ConfidenceLevel, DEFAULT_LEVELS};

// ---------------------------------------------------------------------------
// Group labels ("Favors A ... Favors B")
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelPlacement {
    #[default]
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLabels {
    #[serde(default = "GroupLabels::default_first")]
    pub first: String,
    #[serde(default = "GroupLabels::default_second")]
    pub second: String,
    #[serde(default)]
    pub placement: LabelPlacement,
    /// Number of spaces between the two labels.
    #[serde(default = "GroupLabels::default_spacing")]
    pub spacing: usize,
}

impl GroupLabels {
    fn default_first() -> String {
        "Treatment".into()
    }
    fn default_second() -> String {
        "Placebo".into()
    }
    fn default_spacing() -> usize {
        24
    }

    pub fn text(&self) -> String {
        format!(
            "Favors {}{}Favors {}",
            self.first,
            " ".repeat(self.spacing),
            self.second
        )
    }
}

impl Default for GroupLabels {
    fn default() -> Self {
        Self {
            first: Self::default_first(),
            second: Self::default_second(),
            placement: LabelPlacement::default(),
            spacing: Self::default_spacing(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlotConfig
// ---------------------------------------------------------------------------

/// Everything that shapes one sierra plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub estimator: EstimatorKind,
    #[serde(default)]
    pub fallback: FallbackPolicy,
    #[serde(default)]
    pub log_scale: bool,
    #[serde(default)]
    pub reference_line: f64,
    #[serde(default = "PlotConfig::default_x_label")]
    pub x_label: String,
    #[serde(default = "PlotConfig::default_time_label")]
    pub time_label: String,
    #[serde(default = "PlotConfig::default_group_labels")]
    pub group_labels: Option<GroupLabels>,
    /// Coverage levels; drawn widest first regardless of the order given.
    #[serde(default = "PlotConfig::default_levels")]
    pub levels: Vec<f64>,
    #[serde(default)]
    pub colormap: Colormap,
    #[serde(default = "PlotConfig::default_dpi")]
    pub dpi: u32,
    /// Figure width × height in inches.
    #[serde(default = "PlotConfig::default_figure_size")]
    pub figure_size: [f64; 2],
    /// Spacing between time-axis ticks; `None` lets the backend choose.
    #[serde(default)]
    pub time_tick_step: Option<f64>,
}

impl PlotConfig {
    fn default_x_label() -> String {
        "Risk Difference".into()
    }
    fn default_time_label() -> String {
        "Days".into()
    }
    fn default_group_labels() -> Option<GroupLabels> {
        Some(GroupLabels::default())
    }
    fn default_levels() -> Vec<f64> {
        DEFAULT_LEVELS.to_vec()
    }
    fn default_dpi() -> u32 {
        600
    }
    fn default_figure_size() -> [f64; 2] {
        [6.0, 8.0]
    }

    /// Risk-difference preset: additive estimator, linear axis, reference 0.
    pub fn difference() -> Self {
        Self {
            columns: ColumnMapping::difference(),
            estimator: EstimatorKind::Additive,
            fallback: FallbackPolicy::default(),
            log_scale: false,
            reference_line: 0.0,
            x_label: Self::default_x_label(),
            time_label: Self::default_time_label(),
            group_labels: Self::default_group_labels(),
            levels: Self::default_levels(),
            colormap: Colormap::default(),
            dpi: Self::default_dpi(),
            figure_size: Self::default_figure_size(),
            time_tick_step: None,
        }
    }

    /// Risk-ratio preset: multiplicative estimator, log axis, reference 1.
    pub fn ratio() -> Self {
        Self {
            columns: ColumnMapping::ratio(),
            estimator: EstimatorKind::Multiplicative,
            log_scale: true,
            reference_line: 1.0,
            x_label: "Risk Ratio".into(),
            ..Self::difference()
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.confidence_levels()?;
        if self.dpi == 0 {
            return Err(SierraError::Config("dpi must be positive".into()));
        }
        if self.figure_size.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(SierraError::Config(format!(
                "figure size {:?} must be positive",
                self.figure_size
            )));
        }
        if let Some(step) = self.time_tick_step {
            if !(step.is_finite() && step > 0.0) {
                return Err(SierraError::Config(format!(
                    "time tick step {step} must be positive"
                )));
            }
        }
        if self.log_scale && self.reference_line <= 0.0 {
            return Err(SierraError::Config(format!(
                "reference line {} cannot be shown on a log axis",
                self.reference_line
            )));
        }
        Ok(())
    }

    /// Validated levels in drawing order.
    pub fn confidence_levels(&self) -> Result<Vec<ConfidenceLevel>> {
        levels::drawing_order(&self.levels)
    }

    /// Raster size at the configured DPI.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |inches: f64| (inches * self.dpi as f64).round().max(1.0) as u32;
        (px(self.figure_size[0]), px(self.figure_size[1]))
    }

    /// Convert a point size to pixels at the configured DPI.
    pub fn points_to_px(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self::difference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn ratio_preset_switches_axis_and_estimator() {
        let cfg = PlotConfig::ratio();
        assert!(cfg.log_scale);
        assert_eq!(cfg.reference_line, 1.0);
        assert_eq!(cfg.estimator, EstimatorKind::Multiplicative);
        assert_eq!(cfg.columns.estimate, "RR");
        assert_eq!(cfg.dpi, 600);
    }

    #[test]
    fn pixel_size_at_600_dpi() {
        assert_eq!(PlotConfig::default().pixel_size(), (3600, 4800));
    }

    #[test]
    fn group_label_text_has_spacing() {
        let labels = GroupLabels {
            first: "Vaccine".into(),
            spacing: 3,
            ..GroupLabels::default()
        };
        assert_eq!(labels.text(), "Favors Vaccine   Favors Placebo");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PlotConfig =
            serde_json::from_str(r#"{"log_scale": true, "reference_line": 1.0, "estimator": "multiplicative"}"#)
                .unwrap();
        assert_eq!(cfg.levels.len(), 6);
        assert_eq!(cfg.x_label, "Risk Difference");
        assert_eq!(cfg.estimator, EstimatorKind::Multiplicative);
        assert!(cfg.group_labels.is_some());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = PlotConfig::default();
        cfg.levels = vec![0.5, 1.0];
        assert!(matches!(cfg.validate(), Err(SierraError::InvalidInput(_))));

        let mut cfg = PlotConfig::default();
        cfg.dpi = 0;
        assert!(matches!(cfg.validate(), Err(SierraError::Config(_))));

        let mut cfg = PlotConfig::ratio();
        cfg.reference_line = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"x_label": "RD", "group_labels": {{"first": "Vaccine", "placement": "bottom"}}}}"#
        )
        .unwrap();
        let cfg = PlotConfig::load(file.path()).unwrap();
        let labels = cfg.group_labels.unwrap();
        assert_eq!(labels.first, "Vaccine");
        assert_eq!(labels.second, "Placebo");
        assert_eq!(labels.placement, LabelPlacement::Bottom);
    }
}
