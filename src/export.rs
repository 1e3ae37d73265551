//! Headless PNG rendering with plotters.
//!
//! Charts are drawn into an in-memory RGB buffer sized from the configured
//! figure size and DPI, then encoded with `image`.

use std::path::Path;

use anyhow::{Context, Result};
use palette::Srgba;
use plotters::coord::combinators::{BindKeyPoints, WithKeyPoints};
use plotters::coord::ranged1d::Ranged;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::color::{self, Colormap};
use crate::config::{LabelPlacement, PlotConfig};
use crate::data::model::ObservationSeries;
use crate::density::DensityGrid;
use crate::distributions::{self, Histogram, Simulation, Summary};
use crate::sierra::surface::dash_segments;
use crate::sierra::{step_ticks, AxisLayout, ReferenceLine, SierraScene, StepRegion, Surface};

type Area<'b> = DrawingArea<BitMapBackend<'b>, Shift>;
type TimeAxis = WithKeyPoints<RangedCoordf64>;
type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, TimeAxis>>;

/// Time axis labelled at `ticks`, or at plotters' own round values when
/// no tick step is configured.
fn time_axis(range: (f64, f64), ticks: Option<Vec<f64>>) -> TimeAxis {
    let coord = RangedCoordf64::from(range.0..range.1);
    let ticks = ticks.unwrap_or_else(|| coord.key_points(10));
    coord.with_key_points(ticks)
}

fn rgba(color: Srgba) -> RGBAColor {
    let [r, g, b, _] = color::to_rgba8(color);
    RGBAColor(r, g, b, color.alpha as f64)
}

/// Font sizes and stroke widths scaled to the output DPI.
struct Metrics {
    tick: f64,
    label: f64,
    group: f64,
    line: u32,
}

impl Metrics {
    fn new(config: &PlotConfig) -> Self {
        Self {
            tick: config.points_to_px(9.0),
            label: config.points_to_px(11.0),
            group: config.points_to_px(10.0),
            line: config.points_to_px(0.75).round().max(1.0) as u32,
        }
    }

    fn text(size: f64) -> TextStyle<'static> {
        TextStyle::from(("sans-serif", size).into_font())
    }
}

/// Draw into a fresh white canvas and write it to `path` as PNG.
fn render_png(
    size: (u32, u32),
    path: &Path,
    draw: impl FnOnce(&Area<'_>) -> Result<()>,
) -> Result<()> {
    let (w, h) = size;
    let mut buffer = vec![0u8; w as usize * h as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    let img = image::RgbImage::from_raw(w, h, buffer).context("raster buffer has the wrong size")?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!("wrote {w}×{h} PNG to {}", path.display());
    Ok(())
}

/// Reserve a strip for the "Favors … Favors …" label and return the area
/// left for the chart.
fn place_group_label<'b>(root: &Area<'b>, axes: &AxisLayout, metrics: &Metrics) -> Result<Area<'b>> {
    let Some((text, placement)) = &axes.group_label else {
        return Ok(root.clone());
    };
    let (width, height) = root.dim_in_pixel();
    let strip = (metrics.group * 2.5).round() as u32;
    let (label_area, chart_area) = match placement {
        LabelPlacement::Top => root.split_vertically(strip),
        LabelPlacement::Bottom => {
            let (chart, label) = root.split_vertically(height.saturating_sub(strip));
            (label, chart)
        }
    };
    let style = Metrics::text(metrics.group);
    let (tw, th) = label_area.estimate_text_size(text, &style)?;
    let x = (width.saturating_sub(tw) / 2) as i32;
    let y = (strip.saturating_sub(th) / 2) as i32;
    label_area.draw_text(text, &style, (x, y))?;
    Ok(chart_area)
}

fn build_chart<'a, 'b>(
    area: &'a Area<'b>,
    x_range: (f64, f64),
    time_axis: TimeAxis,
    metrics: &Metrics,
) -> Result<Chart<'a, 'b>> {
    let chart = ChartBuilder::on(area)
        .margin((metrics.label * 0.8) as u32)
        .x_label_area_size((metrics.label * 3.5) as u32)
        .y_label_area_size((metrics.label * 4.5) as u32)
        .build_cartesian_2d(x_range.0..x_range.1, time_axis)?;
    Ok(chart)
}

fn draw_mesh(chart: &mut Chart<'_, '_>, axes: &AxisLayout, metrics: &Metrics) -> Result<()> {
    let scale = axes.scale;
    let x_fmt = move |v: &f64| scale.format_tick(*v);
    let t_fmt = |v: &f64| format!("{v:.0}");
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh()
        .x_desc(axes.x_label.as_str())
        .y_desc(axes.time_label.as_str())
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&t_fmt)
        .label_style(Metrics::text(metrics.tick))
        .axis_desc_style(Metrics::text(metrics.label));
    mesh.draw()?;
    Ok(())
}

fn draw_dashed_reference(
    chart: &mut Chart<'_, '_>,
    x: f64,
    t_start: f64,
    t_end: f64,
    width: u32,
) -> Result<()> {
    let span = t_end - t_start;
    let style = BLACK.stroke_width(width);
    chart.draw_series(
        dash_segments(t_start, t_end, span / 60.0, span / 120.0)
            .into_iter()
            .map(|(a, b)| PathElement::new(vec![(x, a), (x, b)], style)),
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Sierra plot
// ---------------------------------------------------------------------------

struct PlottersSurface<'a, 'b> {
    chart: Chart<'a, 'b>,
    axes: AxisLayout,
    metrics: Metrics,
}

impl Surface for PlottersSurface<'_, '_> {
    type Error = anyhow::Error;

    fn configure_axes(&mut self, axes: &AxisLayout) -> Result<()> {
        draw_mesh(&mut self.chart, axes, &self.metrics)
    }

    fn fill_region(&mut self, region: &StepRegion, color: Srgba) -> Result<()> {
        let x0 = self.axes.project_x(region.lower);
        let x1 = self.axes.project_x(region.upper);
        self.chart.draw_series(std::iter::once(Rectangle::new(
            [(x0, region.t_start), (x1, region.t_end)],
            rgba(color).filled(),
        )))?;
        Ok(())
    }

    fn step_line(&mut self, points: &[(f64, f64)], color: Srgba) -> Result<()> {
        let projected: Vec<(f64, f64)> = points
            .iter()
            .map(|&(x, t)| (self.axes.project_x(x), t))
            .collect();
        self.chart.draw_series(LineSeries::new(
            projected,
            rgba(color).stroke_width(self.metrics.line),
        ))?;
        Ok(())
    }

    fn reference_line(&mut self, line: &ReferenceLine) -> Result<()> {
        let x = self.axes.project_x(line.value);
        draw_dashed_reference(&mut self.chart, x, line.t_start, line.t_end, self.metrics.line)
    }
}

/// Render a sierra plot to a PNG file at the configured size and DPI.
pub fn render_sierra(scene: &SierraScene, config: &PlotConfig, path: &Path) -> Result<()> {
    render_png(config.pixel_size(), path, |root| {
        let metrics = Metrics::new(config);
        let chart_area = place_group_label(root, &scene.axes, &metrics)?;
        let chart = build_chart(
            &chart_area,
            scene.axes.plot_x_range(),
            time_axis(scene.axes.time_range, scene.axes.time_ticks()),
            &metrics,
        )?;
        let mut surface = PlottersSurface {
            chart,
            axes: scene.axes.clone(),
            metrics,
        };
        scene.draw(&mut surface)
    })
}

// ---------------------------------------------------------------------------
// Density heatmap
// ---------------------------------------------------------------------------

/// Render the density grid as step rows over time, darker where denser.
pub fn render_heatmap(
    grid: &DensityGrid,
    series: &ObservationSeries,
    config: &PlotConfig,
    path: &Path,
) -> Result<()> {
    let max = grid.max_value();
    let cmap = Colormap::Yarg;
    let max_t = series.max_time();
    let time_range = (0.0, if max_t > 0.0 { max_t } else { 1.0 });

    render_png(config.pixel_size(), path, |root| {
        let metrics = Metrics::new(config);
        let ticks = config.time_tick_step.map(|step| step_ticks(time_range, step));
        let mut chart = build_chart(root, grid.x_range(), time_axis(time_range, ticks), &metrics)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(config.x_label.as_str())
            .y_desc(config.time_label.as_str())
            .label_style(Metrics::text(metrics.tick))
            .axis_desc_style(Metrics::text(metrics.label))
            .draw()?;

        if max > 0.0 {
            for (row, (obs, next_time)) in series.steps().enumerate() {
                let cells = grid.row(row).iter().enumerate().filter(|(_, v)| **v > 0.0);
                chart.draw_series(cells.map(|(col, &v)| {
                    let x0 = grid.column_value(col);
                    let x1 = grid.column_value(col + 1);
                    let fill = rgba(cmap.color_with_alpha(v / max, 1.0)).filled();
                    Rectangle::new([(x0, obs.time), (x1, next_time)], fill)
                }))?;
            }
        }

        draw_dashed_reference(
            &mut chart,
            config.reference_line,
            time_range.0,
            time_range.1,
            metrics.line,
        )
    })
}

// ---------------------------------------------------------------------------
// Product / ratio distributions
// ---------------------------------------------------------------------------

fn draw_histogram(area: &Area<'_>, title: &str, values: &[f64], metrics: &Metrics, with_median: bool) -> Result<()> {
    let bins = distributions::default_bins(values.len());
    let (Some(hist), Some(summary)) = (Histogram::new(values, bins), Summary::new(values)) else {
        log::warn!("{title}: no finite samples to plot");
        return Ok(());
    };
    let x_range = (hist.min, hist.bin_edges(hist.counts.len() - 1).1);
    let y_max = hist.max_count().max(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("{title}: {}", summary.legend(with_median)),
            Metrics::text(metrics.label),
        )
        .margin((metrics.label * 0.8) as u32)
        .x_label_area_size((metrics.label * 2.5) as u32)
        .y_label_area_size((metrics.label * 3.5) as u32)
        .build_cartesian_2d(x_range.0..x_range.1, 0.0..y_max)?;
    chart
        .configure_mesh()
        .label_style(Metrics::text(metrics.tick))
        .draw()?;

    let fill = RGBAColor(226, 74, 51, 0.8).filled();
    chart.draw_series(hist.counts.iter().enumerate().map(|(bin, &count)| {
        let (x0, x1) = hist.bin_edges(bin);
        Rectangle::new([(x0, 0.0), (x1, count as f64)], fill)
    }))?;
    Ok(())
}

/// Render histograms of both marginals, the ratio and the product as a 2×2
/// panel.
pub fn render_distributions(sim: &Simulation, config: &PlotConfig, path: &Path) -> Result<()> {
    render_png(config.pixel_size(), path, |root| {
        let metrics = Metrics::new(config);
        let panels = root.split_evenly((2, 2));
        let p = &sim.params;
        draw_histogram(&panels[0], &format!("N({}, {})", p.mean_1, p.sd_1), &sim.first, &metrics, false)?;
        draw_histogram(&panels[1], &format!("N({}, {})", p.mean_2, p.sd_2), &sim.second, &metrics, false)?;
        draw_histogram(&panels[2], "x2 / x1", &sim.ratio, &metrics, true)?;
        draw_histogram(&panels[3], "x2 · x1", &sim.product, &metrics, true)
    })
}
