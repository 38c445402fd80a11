use std::error::Error;
use std::sync::Arc;

use defectscope::api::HttpApi;
use defectscope::app::DashboardApp;
use defectscope::config::Config;
use defectscope::logging::{self, DebugLog};
use eframe::egui;

fn main() -> Result<(), Box<dyn Error>> {
    let debug_log = DebugLog::default();
    if let Err(err) = logging::init(debug_log.clone()) {
        eprintln!("{err}");
    }

    let config = Config::from_env();
    tracing::info!(api = %config.api_base_url, timeout = ?config.request_timeout, "Starting dashboard");
    let api = Arc::new(HttpApi::new(&config));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Software Defect Prediction")
            .with_inner_size([1200.0, 800.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Software Defect Prediction",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(&config, api, debug_log)))),
    )?;

    Ok(())
}
