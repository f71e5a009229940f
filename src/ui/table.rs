use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};
use town_scout::dashboard::view::TableSection;

const ROW_HEIGHT: f32 = 18.0;

/// Striped, scrollable table of the filtered listings.
pub fn listings_table(ui: &mut Ui, section: &TableSection) {
    if section.columns.is_empty() {
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(320.0)
        .columns(Column::auto().at_least(70.0), section.columns.len())
        .header(ROW_HEIGHT + 4.0, |mut header| {
            for name in &section.columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, section.rows.len(), |mut row| {
                let cells = &section.rows[row.index()];
                for cell in cells {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell);
                    });
                }
            });
        });
}
