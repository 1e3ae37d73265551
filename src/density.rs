//! Probability-density heatmap of an observation series.
//!
//! Each observation contributes one row: the normal density implied by its
//! estimate and reported upper limit, sampled on a grid shared by all rows.

use crate::data::model::ObservationSeries;
use crate::error::{Result, SierraError};
use crate::stats;

/// Default number of grid columns on each side of zero.
pub const DEFAULT_HALF_WIDTH: usize = 500;

/// Columns reserved beyond the widest limit so the tails stay visible.
const TAIL_COLUMNS: usize = 100;

/// Densities above this are clipped.
pub const DENSITY_CAP: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    rows: usize,
    half_width: usize,
    /// Distance between neighbouring columns, in estimate units.
    step: f64,
    values: Vec<f64>,
}

impl DensityGrid {
    /// Sample every observation's density on `2·half_width` columns centred
    /// on zero. The column spacing is chosen so the widest limit lands
    /// `TAIL_COLUMNS` short of the edge.
    pub fn compute(series: &ObservationSeries, half_width: usize) -> Result<Self> {
        if half_width <= TAIL_COLUMNS {
            return Err(SierraError::InvalidInput(format!(
                "half width {half_width} must exceed {TAIL_COLUMNS}"
            )));
        }

        let min_lower = series
            .iter()
            .map(|o| o.lower_bound)
            .filter(|v| v.is_finite())
            .fold(f64::INFINITY, f64::min);
        let max_upper = series
            .iter()
            .map(|o| o.upper_bound)
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        let extent = min_lower.abs().max(max_upper.abs());
        if !(extent.is_finite() && extent > 0.0) {
            return Err(SierraError::InvalidInput(
                "limits span no range; nothing to shade".into(),
            ));
        }
        let step = extent / (half_width - TAIL_COLUMNS) as f64;

        let rows = series.len();
        let cols = 2 * half_width;
        let mut values = vec![0.0; rows * cols];
        for (row, obs) in series.iter().enumerate() {
            let scale = obs.scale();
            for col in 0..cols {
                let x = (col as f64 - half_width as f64) * step;
                if let Some(d) = stats::normal_pdf(x, obs.estimate, scale) {
                    values[row * cols + col] = d.min(DENSITY_CAP);
                }
            }
        }

        Ok(Self {
            rows,
            half_width,
            step,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        2 * self.half_width
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols() {
            Some(self.values[row * self.cols() + col])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let cols = self.cols();
        &self.values[row * cols..(row + 1) * cols]
    }

    /// Estimate value at the left edge of `col`.
    pub fn column_value(&self, col: usize) -> f64 {
        (col as f64 - self.half_width as f64) * self.step
    }

    /// Estimate-axis extent covered by the grid.
    pub fn x_range(&self) -> (f64, f64) {
        (self.column_value(0), self.column_value(self.cols()))
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Observation;
    use approx::assert_abs_diff_eq;

    fn series() -> ObservationSeries {
        ObservationSeries::new(vec![
            Observation::new(0.0, 0.0, f64::NAN, f64::NAN),
            Observation::new(1.0, 0.0, -0.196, 0.196),
            Observation::new(2.0, 0.1, -0.096, 0.296),
        ])
        .unwrap()
    }

    #[test]
    fn grid_shape_and_step() {
        let grid = DensityGrid::compute(&series(), 500).unwrap();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 1000);
        assert_abs_diff_eq!(grid.step(), 0.296 / 400.0, epsilon = 1e-15);
        assert_abs_diff_eq!(grid.x_range().0, -500.0 * grid.step(), epsilon = 1e-12);
    }

    #[test]
    fn degenerate_row_stays_empty() {
        let grid = DensityGrid::compute(&series(), 500).unwrap();
        assert!(grid.row(0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn density_peaks_at_the_estimate() {
        let grid = DensityGrid::compute(&series(), 500).unwrap();
        let row = grid.row(1);
        let (peak_col, _) = row
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
        assert_eq!(peak_col, 500);
        // sd = 0.1 → peak density 1 / (0.1·√(2π))
        assert_abs_diff_eq!(row[500], 3.989422804, epsilon = 1e-6);

        let shifted = grid.row(2);
        let peak = grid.column_value(
            shifted
                .iter()
                .enumerate()
                .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                .0,
        );
        assert_abs_diff_eq!(peak, 0.1, epsilon = grid.step());
    }

    #[test]
    fn densities_are_capped() {
        let tight = ObservationSeries::new(vec![
            Observation::new(0.0, 0.0, -1e-6, 1e-6),
            Observation::new(1.0, 0.0, -1.0, 1.0),
        ])
        .unwrap();
        let grid = DensityGrid::compute(&tight, 500).unwrap();
        assert_eq!(grid.max_value(), DENSITY_CAP);
    }

    #[test]
    fn rejects_narrow_grid_and_empty_extent() {
        assert!(DensityGrid::compute(&series(), 100).is_err());
        let flat = ObservationSeries::new(vec![Observation::new(0.0, 0.0, 0.0, 0.0)]).unwrap();
        assert!(DensityGrid::compute(&flat, 500).is_err());
    }
}
