mod app;
mod cli;
mod state;
mod ui;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;

use sierra_plots::config::PlotConfig;
use sierra_plots::data::loader;
use sierra_plots::density::DensityGrid;
use sierra_plots::distributions::{self, NormalPair};
use sierra_plots::export;
use sierra_plots::sierra::SierraScene;

use app::SierraApp;
use cli::{Cli, Command};
use state::AppState;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.plot.resolve()?;

    match cli.command {
        Some(Command::Render { file, output }) => render(&file, &output, &config),
        Some(Command::Heatmap {
            file,
            output,
            half_width,
        }) => heatmap(&file, &output, half_width, &config),
        Some(Command::Distributions {
            output,
            m1,
            s1,
            m2,
            s2,
            samples,
            seed,
        }) => {
            let params = NormalPair {
                mean_1: m1,
                sd_1: s1,
                mean_2: m2,
                sd_2: s2,
            };
            let sim = distributions::simulate(params, samples, seed)?;
            export::render_distributions(&sim, &config, &output)
        }
        Some(Command::View { file }) => view(file.as_deref(), config),
        None => view(None, config),
    }
}

fn render(file: &Path, output: &Path, config: &PlotConfig) -> Result<()> {
    let series = loader::load_series(file, &config.columns)?;
    let scene = SierraScene::build(&series, config)
        .with_context(|| format!("building sierra plot for {}", file.display()))?;
    export::render_sierra(&scene, config, output)
}

fn heatmap(file: &Path, output: &Path, half_width: usize, config: &PlotConfig) -> Result<()> {
    let series = loader::load_series(file, &config.columns)?;
    let grid = DensityGrid::compute(&series, half_width)
        .with_context(|| format!("computing densities for {}", file.display()))?;
    export::render_heatmap(&grid, &series, config, output)
}

fn view(file: Option<&Path>, config: PlotConfig) -> Result<()> {
    let mut state = AppState::with_config(config);
    if let Some(path) = file {
        match loader::load_file(path) {
            Ok(table) => state.set_table(table, Some(path)),
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 900.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Sierra Plots",
        options,
        Box::new(|_cc| Ok(Box::new(SierraApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
