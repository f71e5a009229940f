mod app;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{bail, Context};
use app::TownScoutApp;
use clap::Parser;
use eframe::egui;
use state::AppState;
use town_scout::config::AppConfig;
use town_scout::dashboard::render;
use town_scout::data::model::Field;

/// Real-estate towns dashboard
#[derive(Parser, Debug)]
#[command(version, about = "Filter and chart UK town listings")]
struct Args {
    /// Listings file (xlsx, xls, ods, csv, tsv, json or parquet)
    data_file: Option<PathBuf>,

    /// JSON dashboard configuration; built-in defaults when absent
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Print the dashboard as text instead of opening a window
    #[arg(long = "summary", action)]
    summary: bool,

    /// Only show towns in this county (repeatable)
    #[arg(long = "county")]
    county: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::from_path(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => AppConfig::default(),
    };
    let mut state = AppState::new(config);

    if args.summary {
        let Some(path) = &args.data_file else {
            bail!("--summary needs a data file");
        };
        state.load_path(path)?;
        apply_counties(&mut state, &args.county);
        let Some(ctx) = state.context() else {
            bail!("no table loaded from {}", path.display());
        };
        print!("{}", render(&ctx));
        return Ok(());
    }

    if let Some(path) = &args.data_file {
        // A failed preload leaves the window open with the error in the status line.
        if state.load_path(path).is_ok() {
            apply_counties(&mut state, &args.county);
        }
    }
    run_window(state)
}

fn apply_counties(state: &mut AppState, counties: &[String]) {
    if !counties.is_empty() {
        state.select_only(&Field::County, counties);
    }
}

fn run_window(state: AppState) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };
    let title = state.config.title.clone();

    eframe::run_native(
        &title,
        options,
        Box::new(|_cc| Ok(Box::new(TownScoutApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("window failed: {e}"))
}
