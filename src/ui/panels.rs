use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use sierra_plots::color::Colormap;
use sierra_plots::config::{GroupLabels, LabelPlacement};
use sierra_plots::estimator::{EstimatorKind, FallbackPolicy};
use sierra_plots::levels::{ConfidenceLevel, DEFAULT_LEVELS};
use sierra_plots::{data::loader, export};

use crate::state::{AppState, Preset};
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Left side panel – plot settings
// ---------------------------------------------------------------------------

/// Render the left settings panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Settings");
    ui.separator();

    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Mode ----
            ui.strong("Mode");
            let mut preset = state.preset;
            ui.horizontal(|ui: &mut Ui| {
                for p in [Preset::Difference, Preset::Ratio] {
                    ui.selectable_value(&mut preset, p, p.label());
                }
            });
            if preset != state.preset {
                state.apply_preset(preset);
            }
            ui.separator();

            // ---- Column mapping ----
            if let Some(table) = &state.table {
                let columns = table.column_names.clone();
                egui::CollapsingHeader::new(RichText::new("Columns").strong())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        let mapping = &mut state.config.columns;
                        for (label, slot) in [
                            ("Time", &mut mapping.time),
                            ("Estimate", &mut mapping.estimate),
                            ("Lower limit", &mut mapping.lower),
                            ("Upper limit", &mut mapping.upper),
                        ] {
                            changed |= column_combo(ui, label, slot, &columns);
                        }
                    });
                ui.separator();
            }

            // ---- Estimator ----
            egui::CollapsingHeader::new(RichText::new("Estimator").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    let config = &mut state.config;
                    egui::ComboBox::from_id_salt("estimator")
                        .selected_text(config.estimator.label())
                        .show_ui(ui, |ui: &mut Ui| {
                            for kind in [EstimatorKind::Additive, EstimatorKind::Multiplicative] {
                                changed |= ui
                                    .selectable_value(&mut config.estimator, kind, kind.label())
                                    .changed();
                            }
                        });
                    let mut strict = config.fallback == FallbackPolicy::Strict;
                    if ui
                        .checkbox(&mut strict, "Reject undefined bounds")
                        .on_hover_text("Off: undefined bounds collapse to 0 (additive) or 1 (multiplicative)")
                        .changed()
                    {
                        config.fallback = if strict {
                            FallbackPolicy::Strict
                        } else {
                            FallbackPolicy::Substitute
                        };
                        changed = true;
                    }
                });
            ui.separator();

            // ---- Axes ----
            egui::CollapsingHeader::new(RichText::new("Axes").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    let config = &mut state.config;
                    changed |= ui.checkbox(&mut config.log_scale, "Log scale").changed();
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("Reference");
                        changed |= ui
                            .add(egui::DragValue::new(&mut config.reference_line).speed(0.01))
                            .changed();
                    });
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("Estimate label");
                        changed |= ui.text_edit_singleline(&mut config.x_label).changed();
                    });
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("Time label");
                        changed |= ui.text_edit_singleline(&mut config.time_label).changed();
                    });
                });
            ui.separator();

            // ---- Group labels ----
            egui::CollapsingHeader::new(RichText::new("Group labels").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    changed |= group_label_editor(ui, &mut state.config.group_labels);
                });
            ui.separator();

            // ---- Levels & colour ----
            egui::CollapsingHeader::new(RichText::new("Confidence levels").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    let colormap = state.config.colormap;
                    egui::ComboBox::from_id_salt("colormap")
                        .selected_text(colormap.name())
                        .show_ui(ui, |ui: &mut Ui| {
                            for cmap in [Colormap::Gray, Colormap::Yarg, Colormap::Hue(210.0)] {
                                changed |= ui
                                    .selectable_value(&mut state.config.colormap, cmap, cmap.name())
                                    .changed();
                            }
                        });

                    for &value in DEFAULT_LEVELS.iter() {
                        let Ok(level) = ConfidenceLevel::new(value) else {
                            continue;
                        };
                        let mut enabled = state.level_enabled(value);
                        ui.horizontal(|ui: &mut Ui| {
                            plot::swatch(ui, colormap.color_with_alpha(value, level.opacity()));
                            if ui.checkbox(&mut enabled, level.to_string()).changed() {
                                state.toggle_level(value);
                            }
                        });
                    }
                    if ui.small_button("Reset").clicked() {
                        state.reset_levels();
                    }
                });
            ui.separator();

            // ---- Observations ----
            egui::CollapsingHeader::new(RichText::new("Observations").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| observation_table(ui, state));
        });

    if changed {
        state.rebuild();
    }
}

fn column_combo(ui: &mut Ui, label: &str, slot: &mut String, columns: &[String]) -> bool {
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        let text = if columns.contains(slot) {
            RichText::new(slot.as_str())
        } else {
            RichText::new(slot.as_str()).color(Color32::RED)
        };
        egui::ComboBox::from_id_salt(label)
            .selected_text(text)
            .show_ui(ui, |ui: &mut Ui| {
                for col in columns {
                    if ui.selectable_label(slot == col, col).clicked() && slot != col {
                        *slot = col.clone();
                        changed = true;
                    }
                }
            });
    });
    changed
}

fn group_label_editor(ui: &mut Ui, labels: &mut Option<GroupLabels>) -> bool {
    let mut changed = false;
    let mut shown = labels.is_some();
    if ui.checkbox(&mut shown, "Show").changed() {
        *labels = shown.then(GroupLabels::default);
        changed = true;
    }
    let Some(labels) = labels else {
        return changed;
    };
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Favors");
        changed |= ui.text_edit_singleline(&mut labels.first).changed();
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Favors");
        changed |= ui.text_edit_singleline(&mut labels.second).changed();
    });
    ui.horizontal(|ui: &mut Ui| {
        for placement in [LabelPlacement::Top, LabelPlacement::Bottom] {
            let text = match placement {
                LabelPlacement::Top => "Top",
                LabelPlacement::Bottom => "Bottom",
            };
            changed |= ui
                .selectable_value(&mut labels.placement, placement, text)
                .changed();
        }
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Spacing");
        changed |= ui
            .add(egui::DragValue::new(&mut labels.spacing).range(0..=80))
            .changed();
    });
    changed
}

fn observation_table(ui: &mut Ui, state: &AppState) {
    let Some(series) = &state.series else {
        ui.label("No observations.");
        return;
    };
    let fmt = |v: f64| {
        if v.is_finite() {
            format!("{v:.4}")
        } else {
            "–".to_string()
        }
    };
    TableBuilder::new(ui)
        .striped(true)
        .columns(Column::auto().at_least(48.0), 4)
        .max_scroll_height(240.0)
        .header(18.0, |mut header| {
            for name in ["t", "estimate", "lower", "upper"] {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            let rows = series.observations();
            body.rows(16.0, rows.len(), |mut row| {
                let obs = &rows[row.index()];
                for v in [obs.time, obs.estimate, obs.lower_bound, obs.upper_bound] {
                    row.col(|ui: &mut Ui| {
                        ui.label(fmt(v));
                    });
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.scene.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export PNG…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(source) = &state.source {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ui.label(name);
        }
        if let Some(summary) = plot::scene_summary(state) {
            ui.label(summary);
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open confidence-limit series")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        match loader::load_file(&path) {
            Ok(table) => {
                log::info!(
                    "Loaded {} rows with columns {:?}",
                    table.len(),
                    table.column_names
                );
                state.set_table(table, Some(&path));
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

fn export_dialog(state: &mut AppState) {
    let Some(scene) = &state.scene else {
        return;
    };
    let file = rfd::FileDialog::new()
        .set_title("Export sierra plot")
        .add_filter("PNG", &["png"])
        .set_file_name("sierra_plot.png")
        .save_file();

    if let Some(path) = file {
        match export::render_sierra(scene, &state.config, &path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::error!("Export failed: {e:#}");
                state.status_message = Some(format!("Export failed: {e:#}"));
            }
        }
    }
}
