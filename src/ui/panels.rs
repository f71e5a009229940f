use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use town_scout::data::filter::{EmptySelection, NumericRange, PriceFilterMode};
use town_scout::data::model::{Bedrooms, Field, PriceKind};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.table.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            checklist(ui, state, Field::County, true);
            checklist(ui, state, Field::Town, false);
            town_drill_down(ui, state);

            ui.horizontal(|ui: &mut Ui| {
                ui.label("Empty selection");
                let current = state.criteria.empty_selection;
                let mut chosen = current;
                egui::ComboBox::from_id_salt("empty_selection")
                    .selected_text(empty_selection_label(current))
                    .show_ui(ui, |ui: &mut Ui| {
                        for policy in [EmptySelection::MatchNone, EmptySelection::MatchAll] {
                            ui.selectable_value(&mut chosen, policy, empty_selection_label(policy));
                        }
                    });
                if chosen != current {
                    state.set_empty_selection(chosen);
                }
            });
            ui.separator();

            price_filter(ui, state);
            ui.separator();

            for field in [Field::Commute, Field::Population] {
                numeric_filter(ui, state, field);
            }
            ui.separator();

            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }
        });
}

fn empty_selection_label(policy: EmptySelection) -> &'static str {
    match policy {
        EmptySelection::MatchNone => "shows nothing",
        EmptySelection::MatchAll => "shows everything",
    }
}

/// Collapsible checkbox list over the unique values of a categorical field.
fn checklist(ui: &mut Ui, state: &mut AppState, field: Field, open: bool) {
    // Clone what we need so we can mutate state inside the loop.
    let Some(all_values) = state
        .table
        .as_ref()
        .and_then(|t| t.unique_values.get(&field))
        .cloned()
    else {
        return;
    };

    let n_selected = state
        .criteria
        .categorical
        .get(&field)
        .map_or(0, |s| s.len());
    let header_text = format!("{}  ({n_selected}/{})", field.label(), all_values.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(field.to_string())
        .default_open(open)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all(&field);
                }
                if ui.small_button("None").clicked() {
                    state.select_none(&field);
                }
            });

            for value in &all_values {
                let mut checked = state
                    .criteria
                    .categorical
                    .get(&field)
                    .is_some_and(|s| s.contains(value));
                if ui.checkbox(&mut checked, value.as_str()).changed() {
                    state.toggle_value(&field, value);
                }
            }
        });
}

/// Single-town shortcut over the town checklist.
fn town_drill_down(ui: &mut Ui, state: &mut AppState) {
    let Some(towns) = state
        .table
        .as_ref()
        .and_then(|t| t.unique_values.get(&Field::Town))
        .cloned()
    else {
        return;
    };
    let current = match state.criteria.categorical.get(&Field::Town) {
        Some(selected) if selected.len() == 1 => selected.iter().next().cloned(),
        _ => None,
    };

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Town");
        let mut chosen = current.clone();
        egui::ComboBox::from_id_salt("town_drill_down")
            .selected_text(current.as_deref().unwrap_or("All towns"))
            .show_ui(ui, |ui: &mut Ui| {
                ui.selectable_value(&mut chosen, None, "All towns");
                for town in &towns {
                    ui.selectable_value(&mut chosen, Some(town.clone()), town.as_str());
                }
            });
        if chosen != current {
            match chosen {
                Some(town) => state.select_only(&Field::Town, [town]),
                None => state.select_all(&Field::Town),
            }
        }
    });
}

fn price_filter(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Bedroom prices");

    let Some(price) = state.criteria.price.clone() else {
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        for kind in [PriceKind::Asking, PriceKind::Rental] {
            if ui
                .selectable_label(price.kind == kind, kind.to_string())
                .clicked()
            {
                state.set_price_kind(kind);
            }
        }
    });

    ui.horizontal(|ui: &mut Ui| {
        for b in Bedrooms::ALL {
            let mut checked = price.bedrooms.contains(&b);
            if ui.checkbox(&mut checked, format!("{b} bed")).changed() {
                state.toggle_bedroom(b);
            }
        }
    });

    let bounds = state.price_bounds();
    if let Some(range) = range_editor(ui, "price_range", "Limit price", price.range, bounds) {
        state.set_price_range(range);
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Apply to");
        let mut chosen = price.mode;
        egui::ComboBox::from_id_salt("price_mode")
            .selected_text(price_mode_label(price.mode))
            .show_ui(ui, |ui: &mut Ui| {
                for mode in [PriceFilterMode::RowLevel, PriceFilterMode::ColumnLevel] {
                    ui.selectable_value(&mut chosen, mode, price_mode_label(mode));
                }
            });
        if chosen != price.mode {
            state.set_price_mode(chosen);
        }
    });
}

fn price_mode_label(mode: PriceFilterMode) -> &'static str {
    match mode {
        PriceFilterMode::RowLevel => "whole towns",
        PriceFilterMode::ColumnLevel => "each bedroom column",
    }
}

fn numeric_filter(ui: &mut Ui, state: &mut AppState, field: Field) {
    let available = state.table.as_ref().is_some_and(|t| t.has_field(&field));
    if !available {
        return;
    }
    ui.strong(field.label());
    let current = state.criteria.ranges.get(&field).copied();
    let bounds = state.column_bounds(&field);
    let limit = format!("Limit {}", field.label().to_lowercase());
    if let Some(range) = range_editor(ui, &field.to_string(), &limit, current, bounds) {
        state.set_range(&field, range);
    }
}

/// Optional min/max editor. Returns the new range when the user changed it.
fn range_editor(
    ui: &mut Ui,
    id: &str,
    label: &str,
    current: Option<NumericRange>,
    bounds: Option<NumericRange>,
) -> Option<Option<NumericRange>> {
    let mut enabled = current.is_some();
    let mut range = current
        .or(bounds)
        .unwrap_or_else(|| NumericRange::new(0.0, 0.0));
    let speed = bounds.map_or(1.0, |b| ((b.max - b.min) / 200.0).max(0.1));
    let mut changed = false;

    ui.push_id(id, |ui: &mut Ui| {
        changed |= ui.checkbox(&mut enabled, label).changed();
        if enabled {
            ui.horizontal(|ui: &mut Ui| {
                changed |= ui
                    .add(egui::DragValue::new(&mut range.min).speed(speed).prefix("min "))
                    .changed();
                changed |= ui
                    .add(egui::DragValue::new(&mut range.max).speed(speed).prefix("max "))
                    .changed();
            });
        }
    });

    if range.max < range.min {
        range.max = range.min;
    }
    changed.then(|| enabled.then_some(range))
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
        });

        ui.separator();

        if let Some(path) = &state.loaded_path {
            ui.label(path.display().to_string());
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open towns data")
        .add_filter(
            "Supported files",
            &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv", "tsv", "json", "parquet", "pq"],
        )
        .add_filter("Spreadsheet", &["xlsx", "xlsm", "xlsb", "xls", "ods"])
        .add_filter("CSV", &["csv", "tsv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        // Errors are logged and shown in the status line by load_path.
        let _ = state.load_path(&path);
    }
}
