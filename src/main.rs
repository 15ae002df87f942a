#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod config;
mod detector;
mod kinect;
mod pipeline;
mod sim;
mod types;
mod ui;

use anyhow::Result;
use gpui::Application;

use config::AppConfig;
use sim::{SimPlatform, SimScript};

fn main() -> Result<()> {
    env_logger::init();

    let config = AppConfig::from_env();
    log::info!(
        "loading gesture {:?} from {}",
        config.detector.gesture_name,
        config.detector.gesture_database.display()
    );
    let platform = SimPlatform::new(SimScript::demo());

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, config.clone(), platform.clone()) {
                eprintln!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
