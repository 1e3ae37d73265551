use palette::Srgba;

use crate::config::{LabelPlacement, PlotConfig};
use crate::data::model::ObservationSeries;
use crate::error::Result;
use crate::levels::ConfidenceLevel;

use super::surface::Surface;

/// Fraction of the largest |limit| added on each side of the estimate axis.
pub const AXIS_MARGIN: f64 = 0.1;

// ---------------------------------------------------------------------------
// Axes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisScale {
    Linear,
    Log,
}

impl AxisScale {
    /// Map a data value to plot space (natural log for `Log`).
    /// Non-positive values on a log axis map to −∞.
    pub fn project(self, x: f64) -> f64 {
        match self {
            AxisScale::Linear => x,
            AxisScale::Log if x > 0.0 => x.ln(),
            AxisScale::Log => f64::NEG_INFINITY,
        }
    }

    pub fn unproject(self, v: f64) -> f64 {
        match self {
            AxisScale::Linear => v,
            AxisScale::Log => v.exp(),
        }
    }

    /// Tick label for a plot-space value.
    pub fn format_tick(self, v: f64) -> String {
        let x = self.unproject(v);
        let magnitude = x.abs();
        if magnitude != 0.0 && !(0.01..1000.0).contains(&magnitude) {
            format!("{x:.1e}")
        } else if magnitude < 1.0 {
            format!("{x:.2}")
        } else {
            format!("{x:.1}")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisLayout {
    pub scale: AxisScale,
    /// Estimate-axis limits in data space.
    pub x_range: (f64, f64),
    pub time_range: (f64, f64),
    pub x_label: String,
    pub time_label: String,
    pub time_tick_step: Option<f64>,
    pub group_label: Option<(String, LabelPlacement)>,
}

impl AxisLayout {
    /// Estimate-axis limits in plot space.
    pub fn plot_x_range(&self) -> (f64, f64) {
        (
            self.scale.project(self.x_range.0),
            self.scale.project(self.x_range.1),
        )
    }

    /// Project `x` to plot space, clamped into the visible range.
    pub fn project_x(&self, x: f64) -> f64 {
        let (lo, hi) = self.plot_x_range();
        self.scale.project(x).clamp(lo, hi)
    }

    /// Time-axis ticks at multiples of the configured step, if one is set.
    pub fn time_ticks(&self) -> Option<Vec<f64>> {
        self.time_tick_step
            .map(|step| step_ticks(self.time_range, step))
    }
}

/// Multiples of `step` inside `range`, inclusive at both ends.
pub fn step_ticks(range: (f64, f64), step: f64) -> Vec<f64> {
    let (lo, hi) = range;
    if !(step.is_finite() && step > 0.0 && lo.is_finite() && hi.is_finite()) || hi < lo {
        return Vec::new();
    }
    let eps = step * 1e-9;
    let first = ((lo - eps) / step).ceil() as i64;
    let last = ((hi + eps) / step).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

/// Symmetric estimate-axis limits: the largest |limit| (|ln limit| on a log
/// axis) plus [`AXIS_MARGIN`], mirrored around 0 (around 1 on a log axis).
pub fn estimate_axis_range(series: &ObservationSeries, scale: AxisScale) -> (f64, f64) {
    let transform = |v: f64| match scale {
        AxisScale::Linear => v,
        AxisScale::Log => v.ln(),
    };
    let limit = series
        .max_abs_limit(transform)
        .filter(|l| *l > 0.0)
        .unwrap_or(1.0);
    let reach = limit * (1.0 + AXIS_MARGIN);
    (scale.unproject(-reach), scale.unproject(reach))
}

// ---------------------------------------------------------------------------
// Scene primitives
// ---------------------------------------------------------------------------

/// One filled rectangle of a band, spanning `[t_start, t_end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRegion {
    pub t_start: f64,
    pub t_end: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandLayer {
    pub level: ConfidenceLevel,
    pub color: Srgba,
    pub regions: Vec<StepRegion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLine {
    pub value: f64,
    pub t_start: f64,
    pub t_end: f64,
}

/// Everything needed to draw one sierra plot, in drawing order.
#[derive(Debug, Clone, PartialEq)]
pub struct SierraScene {
    /// Widest coverage first.
    pub bands: Vec<BandLayer>,
    pub estimate_line: Vec<(f64, f64)>,
    pub estimate_color: Srgba,
    pub reference: ReferenceLine,
    pub axes: AxisLayout,
}

impl SierraScene {
    /// Compute every band, the estimate step line, the reference line and the
    /// axis layout for `series`.
    pub fn build(series: &ObservationSeries, config: &PlotConfig) -> Result<Self> {
        config.validate()?;
        let levels = config.confidence_levels()?;
        let estimator = config.estimator.build(config.fallback);
        let scales: Vec<f64> = series.iter().map(|o| o.scale()).collect();

        let mut bands = Vec::with_capacity(levels.len());
        for level in levels {
            let regions = series
                .steps()
                .zip(&scales)
                .map(|((obs, next_time), &scale)| {
                    let iv = estimator.interval_at(level, obs.estimate, scale)?;
                    Ok(StepRegion {
                        t_start: obs.time,
                        t_end: next_time,
                        lower: iv.lower,
                        upper: iv.upper,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            bands.push(BandLayer {
                level,
                color: config
                    .colormap
                    .color_with_alpha(level.value(), level.opacity()),
                regions,
            });
        }

        let fallback = estimator.fallback();
        let finite_or = |v: f64| if v.is_finite() { v } else { fallback };
        let mut estimate_line = Vec::with_capacity(series.len() * 2);
        for (obs, next_time) in series.steps() {
            let x = finite_or(obs.estimate);
            estimate_line.push((x, obs.time));
            estimate_line.push((x, next_time));
        }
        if let Some(last) = series.observations().last() {
            estimate_line.push((finite_or(last.estimate), last.time));
        }

        let scale = if config.log_scale {
            AxisScale::Log
        } else {
            AxisScale::Linear
        };
        let max_t = series.max_time();
        let time_range = (0.0, if max_t > 0.0 { max_t } else { 1.0 });

        let axes = AxisLayout {
            scale,
            x_range: estimate_axis_range(series, scale),
            time_range,
            x_label: config.x_label.clone(),
            time_label: config.time_label.clone(),
            time_tick_step: config.time_tick_step,
            group_label: config
                .group_labels
                .as_ref()
                .map(|g| (g.text(), g.placement)),
        };

        log::debug!(
            "built sierra scene: {} bands × {} regions",
            bands.len(),
            series.len().saturating_sub(1)
        );

        Ok(Self {
            bands,
            estimate_line,
            estimate_color: config.colormap.contrast(),
            reference: ReferenceLine {
                value: config.reference_line,
                t_start: time_range.0,
                t_end: time_range.1,
            },
            axes,
        })
    }

    /// Replay the scene onto a surface in compositing order.
    pub fn draw<S: Surface>(&self, surface: &mut S) -> std::result::Result<(), S::Error> {
        surface.configure_axes(&self.axes)?;
        for band in &self.bands {
            for region in &band.regions {
                surface.fill_region(region, band.color)?;
            }
        }
        surface.step_line(&self.estimate_line, self.estimate_color)?;
        surface.reference_line(&self.reference)
    }

    pub fn region_count(&self) -> usize {
        self.bands.iter().map(|b| b.regions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Observation;
    use crate::error::SierraError;
    use crate::estimator::FallbackPolicy;
    use approx::assert_abs_diff_eq;
    use std::convert::Infallible;

    #[derive(Debug, PartialEq)]
    enum Call {
        Axes,
        Fill(f32),
        Line(usize),
        Reference(f64),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl Surface for Recorder {
        type Error = Infallible;

        fn configure_axes(&mut self, _axes: &AxisLayout) -> std::result::Result<(), Infallible> {
            self.calls.push(Call::Axes);
            Ok(())
        }

        fn fill_region(&mut self, _region: &StepRegion, color: Srgba) -> std::result::Result<(), Infallible> {
            self.calls.push(Call::Fill(color.alpha));
            Ok(())
        }

        fn step_line(&mut self, points: &[(f64, f64)], _color: Srgba) -> std::result::Result<(), Infallible> {
            self.calls.push(Call::Line(points.len()));
            Ok(())
        }

        fn reference_line(&mut self, line: &ReferenceLine) -> std::result::Result<(), Infallible> {
            self.calls.push(Call::Reference(line.value));
            Ok(())
        }
    }

    fn series() -> ObservationSeries {
        ObservationSeries::new(vec![
            Observation::new(0.0, 0.0, f64::NAN, f64::NAN),
            Observation::new(7.0, -0.01, -0.03, 0.01),
            Observation::new(14.0, -0.02, -0.05, 0.01),
            Observation::new(21.0, -0.03, -0.06, 0.0),
        ])
        .unwrap()
    }

    fn ratio_series() -> ObservationSeries {
        ObservationSeries::new(vec![
            Observation::new(0.0, f64::NAN, f64::NAN, f64::NAN),
            Observation::new(7.0, 0.8, 0.4, 1.6),
            Observation::new(14.0, 0.5, 0.25, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn one_region_per_step_per_level() {
        let cfg = PlotConfig::difference();
        let scene = SierraScene::build(&series(), &cfg).unwrap();
        assert_eq!(scene.bands.len(), 6);
        for band in &scene.bands {
            assert_eq!(band.regions.len(), 3);
        }
        assert_eq!(scene.region_count(), 18);
    }

    #[test]
    fn regions_step_from_each_time_to_the_next() {
        let scene = SierraScene::build(&series(), &PlotConfig::difference()).unwrap();
        let spans: Vec<(f64, f64)> = scene.bands[0]
            .regions
            .iter()
            .map(|r| (r.t_start, r.t_end))
            .collect();
        assert_eq!(spans, vec![(0.0, 7.0), (7.0, 14.0), (14.0, 21.0)]);
    }

    #[test]
    fn degenerate_first_record_renders_at_fallback() {
        let scene = SierraScene::build(&series(), &PlotConfig::difference()).unwrap();
        let first = scene.bands[0].regions[0];
        assert_eq!((first.lower, first.upper), (0.0, 0.0));

        let scene = SierraScene::build(&ratio_series(), &PlotConfig::ratio()).unwrap();
        let first = scene.bands[0].regions[0];
        assert_eq!((first.lower, first.upper), (1.0, 1.0));
        assert_eq!(scene.estimate_line[0], (1.0, 0.0));
    }

    #[test]
    fn bands_are_ordered_widest_first_with_rising_opacity() {
        let mut cfg = PlotConfig::difference();
        cfg.levels = vec![0.38, 0.95, 0.68];
        let scene = SierraScene::build(&series(), &cfg).unwrap();
        let levels: Vec<f64> = scene.bands.iter().map(|b| b.level.value()).collect();
        assert_eq!(levels, vec![0.95, 0.68, 0.38]);
        let alphas: Vec<f32> = scene.bands.iter().map(|b| b.color.alpha).collect();
        assert!(alphas.windows(2).all(|w| w[0] <= w[1]));
        let widths: Vec<f64> = scene
            .bands
            .iter()
            .map(|b| b.regions[1].upper - b.regions[1].lower)
            .collect();
        assert!(widths.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn draw_replays_in_compositing_order() {
        let mut cfg = PlotConfig::difference();
        cfg.levels = vec![0.5, 0.95];
        let scene = SierraScene::build(&series(), &cfg).unwrap();
        let mut rec = Recorder::default();
        scene.draw(&mut rec).unwrap();

        assert_eq!(rec.calls.first(), Some(&Call::Axes));
        assert_eq!(rec.calls.len(), 1 + 6 + 2);
        let fills: Vec<f32> = rec
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Fill(a) => Some(*a),
                _ => None,
            })
            .collect();
        assert!(fills[..3].iter().all(|a| (a - 0.15).abs() < 1e-6));
        assert!(fills[3..].iter().all(|a| (a - 0.6).abs() < 1e-6));
        assert_eq!(rec.calls[7], Call::Line(7));
        assert_eq!(rec.calls[8], Call::Reference(0.0));
    }

    #[test]
    fn estimate_line_is_a_step_function() {
        let scene = SierraScene::build(&series(), &PlotConfig::difference()).unwrap();
        assert_eq!(
            scene.estimate_line,
            vec![
                (0.0, 0.0),
                (0.0, 7.0),
                (-0.01, 7.0),
                (-0.01, 14.0),
                (-0.02, 14.0),
                (-0.02, 21.0),
                (-0.03, 21.0),
            ]
        );
    }

    #[test]
    fn single_observation_has_no_regions() {
        let series = ObservationSeries::new(vec![Observation::new(0.0, 0.1, 0.0, 0.2)]).unwrap();
        let scene = SierraScene::build(&series, &PlotConfig::difference()).unwrap();
        assert_eq!(scene.region_count(), 0);
        assert_eq!(scene.estimate_line, vec![(0.1, 0.0)]);
        assert_eq!(scene.axes.time_range, (0.0, 1.0));
    }

    #[test]
    fn linear_axis_is_symmetric_with_margin() {
        let scene = SierraScene::build(&series(), &PlotConfig::difference()).unwrap();
        let (lo, hi) = scene.axes.x_range;
        assert_abs_diff_eq!(hi, 0.066, epsilon = 1e-12);
        assert_abs_diff_eq!(lo, -0.066, epsilon = 1e-12);
        assert_eq!(scene.axes.time_range, (0.0, 21.0));
        assert_eq!(scene.reference.t_end, 21.0);
    }

    #[test]
    fn log_axis_is_symmetric_around_one() {
        let scene = SierraScene::build(&ratio_series(), &PlotConfig::ratio()).unwrap();
        let (lo, hi) = scene.axes.x_range;
        assert_abs_diff_eq!(lo * hi, 1.0, epsilon = 1e-12);
        let reach = 4.0f64.ln() * 1.1;
        assert_abs_diff_eq!(hi.ln(), reach, epsilon = 1e-12);
        assert_eq!(scene.axes.scale, AxisScale::Log);
    }

    #[test]
    fn log_projection_clamps_non_positive_values() {
        let scene = SierraScene::build(&ratio_series(), &PlotConfig::ratio()).unwrap();
        let (lo, _) = scene.axes.plot_x_range();
        assert_eq!(scene.axes.project_x(0.0), lo);
        assert_abs_diff_eq!(scene.axes.project_x(1.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_level_fails_before_drawing() {
        let mut cfg = PlotConfig::difference();
        cfg.levels = vec![0.95, 1.5];
        assert!(matches!(
            SierraScene::build(&series(), &cfg),
            Err(SierraError::InvalidInput(_))
        ));
    }

    #[test]
    fn strict_policy_surfaces_bad_records() {
        let series = ObservationSeries::new(vec![
            Observation::new(0.0, 0.5, 0.6, 0.4),
            Observation::new(1.0, 0.5, 0.4, 0.6),
        ])
        .unwrap();
        let mut cfg = PlotConfig::difference();
        cfg.fallback = FallbackPolicy::Strict;
        assert!(SierraScene::build(&series, &cfg).is_err());
        cfg.fallback = FallbackPolicy::Substitute;
        assert!(SierraScene::build(&series, &cfg).is_ok());
    }

    #[test]
    fn time_ticks_sit_on_multiples_of_the_step() {
        let mut cfg = PlotConfig::difference();
        cfg.time_tick_step = Some(7.0);
        let scene = SierraScene::build(&series(), &cfg).unwrap();
        assert_eq!(scene.axes.time_ticks(), Some(vec![0.0, 7.0, 14.0, 21.0]));

        cfg.time_tick_step = None;
        let scene = SierraScene::build(&series(), &cfg).unwrap();
        assert_eq!(scene.axes.time_ticks(), None);
    }

    #[test]
    fn weekly_ticks_over_sixteen_weeks() {
        let ticks = step_ticks((0.0, 112.0), 7.0);
        assert_eq!(ticks.len(), 17);
        assert_eq!(&ticks[..3], &[0.0, 7.0, 14.0]);
        assert_eq!(ticks.last(), Some(&112.0));
        assert_eq!(step_ticks((3.0, 20.0), 7.0), vec![7.0, 14.0]);
        assert!(step_ticks((0.0, 10.0), 0.0).is_empty());
    }

    #[test]
    fn tick_labels_unproject_log_values() {
        assert_eq!(AxisScale::Log.format_tick(0.0), "1.0");
        assert_eq!(AxisScale::Linear.format_tick(-0.25), "-0.25");
    }
}
