use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use sierra_plots::config::PlotConfig;
use sierra_plots::density::DEFAULT_HALF_WIDTH;
use sierra_plots::distributions::DEFAULT_SAMPLES;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Sierra plots of time-varying confidence limits")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub plot: PlotArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Open the interactive viewer (default)
    View {
        /// Series to load at start-up (.csv, .json, .parquet)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Render a sierra plot to PNG without a window
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, default_value = "sierra_plot.png")]
        output: PathBuf,
    },

    /// Render the probability-density heatmap to PNG
    Heatmap {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, default_value = "density_heatmap.png")]
        output: PathBuf,

        /// Grid columns on each side of zero
        #[arg(long, default_value_t = DEFAULT_HALF_WIDTH)]
        half_width: usize,
    },

    /// Simulate products and ratios of two normals and plot their histograms
    Distributions {
        #[arg(short, long, default_value = "ratio_product.png")]
        output: PathBuf,

        #[arg(long, default_value_t = 5.0)]
        m1: f64,

        #[arg(long, default_value_t = 1.0)]
        s1: f64,

        #[arg(long, default_value_t = 15.0)]
        m2: f64,

        #[arg(long, default_value_t = 2.0)]
        s2: f64,

        #[arg(long, default_value_t = DEFAULT_SAMPLES)]
        samples: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

/// Plot options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct PlotArgs {
    /// Path to a JSON plot configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Start from the risk-ratio preset (RR columns, log axis)
    #[arg(long, global = true, default_value_t = false, conflicts_with = "config")]
    pub ratio: bool,

    /// Time column (overrides config)
    #[arg(long, global = true)]
    pub time: Option<String>,

    /// Estimate column (overrides config)
    #[arg(long, global = true)]
    pub estimate: Option<String>,

    /// Lower-limit column (overrides config)
    #[arg(long, global = true)]
    pub lower: Option<String>,

    /// Upper-limit column (overrides config)
    #[arg(long, global = true)]
    pub upper: Option<String>,

    /// Output resolution (overrides config)
    #[arg(long, global = true)]
    pub dpi: Option<u32>,

    /// Draw the estimate axis on a log scale (overrides config)
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
    pub log_scale: Option<bool>,

    /// Estimate value of the dashed reference line (overrides config)
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub reference_line: Option<f64>,
}

impl PlotArgs {
    /// Build the effective configuration: file or preset first, then flags.
    pub fn resolve(&self) -> Result<PlotConfig> {
        let mut config = match &self.config {
            Some(path) => PlotConfig::load(path)?,
            None if self.ratio => PlotConfig::ratio(),
            None => PlotConfig::difference(),
        };
        self.apply(&mut config);
        config.validate()?;
        log::debug!("effective config: {config:?}");
        Ok(config)
    }

    fn apply(&self, config: &mut PlotConfig) {
        let columns = &mut config.columns;
        for (flag, slot) in [
            (&self.time, &mut columns.time),
            (&self.estimate, &mut columns.estimate),
            (&self.lower, &mut columns.lower),
            (&self.upper, &mut columns.upper),
        ] {
            if let Some(name) = flag {
                slot.clone_from(name);
            }
        }
        if let Some(dpi) = self.dpi {
            config.dpi = dpi;
        }
        if let Some(log_scale) = self.log_scale {
            config.log_scale = log_scale;
        }
        if let Some(value) = self.reference_line {
            config.reference_line = value;
        }
    }
}
