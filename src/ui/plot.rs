use std::convert::Infallible;

use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_plot::{GridInput, GridMark, Line, LineStyle, Plot, PlotPoints, Polygon};
use palette::Srgba;

use sierra_plots::color;
use sierra_plots::config::LabelPlacement;
use sierra_plots::sierra::{step_ticks, AxisLayout, ReferenceLine, StepRegion, Surface};

use crate::state::AppState;

const GROUP_LABEL_HEIGHT: f32 = 24.0;

/// Most grid marks laid out on the time axis before the step is coarsened.
const MAX_TIME_MARKS: f64 = 200.0;

fn color32(color: Srgba) -> Color32 {
    let [r, g, b, a] = color::to_rgba8(color);
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

// ---------------------------------------------------------------------------
// Shape collection
// ---------------------------------------------------------------------------

/// Plot-space geometry gathered from a scene before handing it to egui_plot.
enum Shape {
    Fill(Vec<[f64; 2]>, Color32),
    Line(Vec<[f64; 2]>, Color32),
    Reference(Vec<[f64; 2]>),
}

#[derive(Default)]
struct EguiShapes {
    axes: Option<AxisLayout>,
    shapes: Vec<Shape>,
}

impl EguiShapes {
    fn project(&self, x: f64) -> f64 {
        match &self.axes {
            Some(axes) => axes.project_x(x),
            None => x,
        }
    }
}

impl Surface for EguiShapes {
    type Error = Infallible;

    fn configure_axes(&mut self, axes: &AxisLayout) -> Result<(), Infallible> {
        self.axes = Some(axes.clone());
        Ok(())
    }

    fn fill_region(&mut self, region: &StepRegion, color: Srgba) -> Result<(), Infallible> {
        let x0 = self.project(region.lower);
        let x1 = self.project(region.upper);
        let (t0, t1) = (region.t_start, region.t_end);
        self.shapes.push(Shape::Fill(
            vec![[x0, t0], [x1, t0], [x1, t1], [x0, t1]],
            color32(color),
        ));
        Ok(())
    }

    fn step_line(&mut self, points: &[(f64, f64)], color: Srgba) -> Result<(), Infallible> {
        let pts = points.iter().map(|&(x, t)| [self.project(x), t]).collect();
        self.shapes.push(Shape::Line(pts, color32(color)));
        Ok(())
    }

    fn reference_line(&mut self, line: &ReferenceLine) -> Result<(), Infallible> {
        let x = self.project(line.value);
        self.shapes
            .push(Shape::Reference(vec![[x, line.t_start], [x, line.t_end]]));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sierra plot (central panel)
// ---------------------------------------------------------------------------

/// Render the sierra plot in the central panel.
pub fn sierra_plot(ui: &mut Ui, state: &AppState) {
    let Some(scene) = &state.scene else {
        ui.centered_and_justified(|ui: &mut Ui| {
            let text = if state.table.is_some() {
                "Fix the settings in the side panel to draw the plot"
            } else {
                "Open a file to draw a sierra plot  (File → Open…)"
            };
            ui.heading(text);
        });
        return;
    };

    let mut collected = EguiShapes::default();
    if let Err(never) = scene.draw(&mut collected) {
        match never {}
    }
    let axes = &scene.axes;
    let (x_min, x_max) = axes.plot_x_range();
    let scale = axes.scale;

    let group_label = |ui: &mut Ui| {
        if let Some((text, _)) = &axes.group_label {
            ui.vertical_centered(|ui: &mut Ui| {
                ui.label(RichText::new(text).strong());
            });
        }
    };
    let placement = axes.group_label.as_ref().map(|(_, p)| *p);

    if placement == Some(LabelPlacement::Top) {
        group_label(ui);
    }
    let reserve = if placement == Some(LabelPlacement::Bottom) {
        GROUP_LABEL_HEIGHT
    } else {
        0.0
    };

    let mut plot = Plot::new("sierra_plot");
    if let Some(step) = axes.time_tick_step {
        plot = plot.y_grid_spacer(move |input| time_grid(input, step));
    }

    plot.height((ui.available_height() - reserve).max(100.0))
        .x_axis_label(axes.x_label.as_str())
        .y_axis_label(axes.time_label.as_str())
        .x_axis_formatter(move |mark, _range| scale.format_tick(mark.value))
        .include_x(x_min)
        .include_x(x_max)
        .include_y(axes.time_range.0)
        .include_y(axes.time_range.1)
        .show_grid(false)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for shape in collected.shapes {
                match shape {
                    Shape::Fill(pts, c) => plot_ui.polygon(
                        Polygon::new(PlotPoints::from(pts))
                            .fill_color(c)
                            .stroke(Stroke::NONE),
                    ),
                    Shape::Line(pts, c) => plot_ui.line(
                        Line::new(PlotPoints::from(pts))
                            .name("estimate")
                            .color(c)
                            .width(1.5),
                    ),
                    Shape::Reference(pts) => plot_ui.line(
                        Line::new(PlotPoints::from(pts))
                            .color(Color32::BLACK)
                            .style(LineStyle::dashed_loose())
                            .width(1.0),
                    ),
                }
            }
        });

    if placement == Some(LabelPlacement::Bottom) {
        group_label(ui);
    }
}

/// Grid marks at multiples of `step` over the visible time range. When
/// zoomed far out the step is multiplied until the marks stay countable.
fn time_grid(input: GridInput, step: f64) -> Vec<GridMark> {
    let (lo, hi) = input.bounds;
    let mut step = step;
    while (hi - lo) / step > MAX_TIME_MARKS {
        step *= 2.0;
    }
    step_ticks((lo, hi), step)
        .into_iter()
        .map(|value| GridMark {
            value,
            step_size: step,
        })
        .collect()
}

/// Summary line for the top bar.
pub fn scene_summary(state: &AppState) -> Option<String> {
    let series = state.series.as_ref()?;
    let scene = state.scene.as_ref()?;
    Some(format!(
        "{} observations over {} {}, {} bands",
        series.len(),
        series.max_time(),
        scene.axes.time_label.to_lowercase(),
        scene.bands.len()
    ))
}

/// Small colour swatch used next to level checkboxes.
pub fn swatch(ui: &mut Ui, color: Srgba) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
    ui.painter().rect_filled(rect, 2.0, color32(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_grid_uses_the_configured_step() {
        let input = GridInput {
            bounds: (0.0, 112.0),
            base_step_size: 1.0,
        };
        let marks = time_grid(input, 7.0);
        let values: Vec<f64> = marks.iter().map(|m| m.value).collect();
        assert_eq!(values.len(), 17);
        assert_eq!(&values[..3], &[0.0, 7.0, 14.0]);
        assert!(marks.iter().all(|m| m.step_size == 7.0));
    }

    #[test]
    fn time_grid_coarsens_when_zoomed_out() {
        let input = GridInput {
            bounds: (0.0, 7.0e4),
            base_step_size: 100.0,
        };
        let marks = time_grid(input, 7.0);
        assert!(marks.len() as f64 <= MAX_TIME_MARKS + 1.0);
        assert!(marks.iter().all(|m| (m.value / 7.0).fract() == 0.0));
    }
}
