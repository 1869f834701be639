mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use app::RetailLensApp;
use eframe::egui;
use retail_lens::config::DEFAULT_SOURCE;
use retail_lens::data::loader;

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE));

    // A failed load is fatal.
    let dataset = loader::cached_dataset(&path).inspect_err(|e| {
        log::error!("Failed to load {}: {e:#}", path.display());
    })?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Retail Lens – Online Retail Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(RetailLensApp::new(dataset)))),
    )
    .map_err(|e| anyhow!("running the dashboard: {e}"))
}
