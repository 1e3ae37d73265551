use palette::Srgba;

use super::scene::{AxisLayout, ReferenceLine, StepRegion};

/// A drawing target for a [`SierraScene`](super::SierraScene).
///
/// Coordinates arrive in data space: `x` is the estimate axis (not yet
/// log-projected), `y` is time. Calls arrive in compositing order: axes,
/// every band region from the widest level to the narrowest, the estimate
/// step line, then the reference line.
pub trait Surface {
    type Error;

    fn configure_axes(&mut self, axes: &AxisLayout) -> Result<(), Self::Error>;

    fn fill_region(&mut self, region: &StepRegion, color: Srgba) -> Result<(), Self::Error>;

    /// Polyline through `(estimate, time)` points.
    fn step_line(&mut self, points: &[(f64, f64)], color: Srgba) -> Result<(), Self::Error>;

    /// Dashed line at a fixed estimate value.
    fn reference_line(&mut self, line: &ReferenceLine) -> Result<(), Self::Error>;
}

/// Split `[start, end]` into dash segments `dash` long with gaps `gap` long.
pub fn dash_segments(start: f64, end: f64, dash: f64, gap: f64) -> Vec<(f64, f64)> {
    let mut segments = Vec::new();
    if !(dash > 0.0 && gap >= 0.0) || end <= start {
        return segments;
    }
    let mut pos = start;
    while pos < end {
        segments.push((pos, (pos + dash).min(end)));
        pos += dash + gap;
    }
    segments
}
