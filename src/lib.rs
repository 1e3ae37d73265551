//! Sierra plots: time-varying confidence intervals drawn as gradient-shaded
//! step bands around a point-estimate step line.
//!
//! ```no_run
//! use std::path::Path;
//! use sierra_plots::{config::PlotConfig, data::loader, export, sierra::SierraScene};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PlotConfig::difference();
//! let series = loader::load_series(Path::new("data_twister.csv"), &config.columns)?;
//! let scene = SierraScene::build(&series, &config)?;
//! export::render_sierra(&scene, &config, Path::new("sierra_plot.png"))?;
//! # Ok(())
//! # }
//! ```

pub mod color;
pub mod config;
pub mod data;
pub mod density;
pub mod distributions;
pub mod error;
pub mod estimator;
pub mod export;
pub mod levels;
pub mod sierra;
pub mod stats;

pub use error::{Result, SierraError};
