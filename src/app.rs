use eframe::egui;
use town_scout::dashboard::render;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TownScoutApp {
    pub state: AppState,
}

impl TownScoutApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for TownScoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: dashboard, rebuilt from the current criteria ----
        let view_model = self.state.context().map(|c| render(&c));
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::dashboard(ui, view_model.as_ref());
        });
    }
}
