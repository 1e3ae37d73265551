use std::path::{Path, PathBuf};

use sierra_plots::config::PlotConfig;
use sierra_plots::data::model::{ObservationSeries, Table};
use sierra_plots::levels::DEFAULT_LEVELS;
use sierra_plots::sierra::SierraScene;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Difference,
    Ratio,
}

impl Preset {
    pub fn label(self) -> &'static str {
        match self {
            Preset::Difference => "Risk difference",
            Preset::Ratio => "Risk ratio",
        }
    }

    pub fn config(self) -> PlotConfig {
        match self {
            Preset::Difference => PlotConfig::difference(),
            Preset::Ratio => PlotConfig::ratio(),
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded table (None until user loads a file).
    pub table: Option<Table>,

    /// File the table came from.
    pub source: Option<PathBuf>,

    pub preset: Preset,

    /// Active plot configuration, edited from the side panel.
    pub config: PlotConfig,

    /// Series extracted from `table` with the current column mapping.
    pub series: Option<ObservationSeries>,

    /// Scene built from `series` and `config` (cached).
    pub scene: Option<SierraScene>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_config(PlotConfig::default())
    }
}

impl AppState {
    pub fn with_config(config: PlotConfig) -> Self {
        let preset = if config.log_scale {
            Preset::Ratio
        } else {
            Preset::Difference
        };
        Self {
            table: None,
            source: None,
            preset,
            config,
            series: None,
            scene: None,
            status_message: None,
        }
    }

    /// Ingest a newly loaded table and rebuild the plot from it.
    pub fn set_table(&mut self, table: Table, source: Option<&Path>) {
        self.table = Some(table);
        self.source = source.map(Path::to_path_buf);
        self.rebuild();
    }

    /// Switch between difference and ratio mode, keeping the levels and
    /// label settings the user already edited.
    pub fn apply_preset(&mut self, preset: Preset) {
        if preset == self.preset {
            return;
        }
        let mut config = preset.config();
        config.levels = std::mem::take(&mut self.config.levels);
        config.colormap = self.config.colormap;
        config.group_labels = self.config.group_labels.take();
        config.time_label = std::mem::take(&mut self.config.time_label);
        config.dpi = self.config.dpi;
        config.figure_size = self.config.figure_size;
        self.config = config;
        self.preset = preset;
        self.rebuild();
    }

    /// Recompute `series` and `scene` after a data or config change.
    pub fn rebuild(&mut self) {
        self.series = None;
        self.scene = None;
        let Some(table) = &self.table else {
            return;
        };

        let result = self.config.validate().and_then(|()| {
            let series = ObservationSeries::from_table(table, &self.config.columns)?;
            let scene = SierraScene::build(&series, &self.config)?;
            Ok((series, scene))
        });

        match result {
            Ok((series, scene)) => {
                log::debug!(
                    "Rebuilt scene: {} observations, {} regions",
                    series.len(),
                    scene.region_count()
                );
                self.series = Some(series);
                self.scene = Some(scene);
                self.status_message = None;
            }
            Err(e) => {
                log::warn!("Cannot build plot: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn level_enabled(&self, level: f64) -> bool {
        self.config.levels.contains(&level)
    }

    /// Toggle one of the default confidence levels on or off.
    pub fn toggle_level(&mut self, level: f64) {
        if let Some(pos) = self.config.levels.iter().position(|&l| l == level) {
            self.config.levels.remove(pos);
        } else {
            self.config.levels.push(level);
            self.config
                .levels
                .sort_by(|a, b| b.total_cmp(a));
        }
        self.rebuild();
    }

    pub fn reset_levels(&mut self) {
        self.config.levels = DEFAULT_LEVELS.to_vec();
        self.rebuild();
    }
}
