//! Emblem Studio
//!
//! Hover-driven emblem viewer with one live parameter panel per emblem:
//! - Emblems turn to face away from the user while hovered, with a slow
//!   breathing tilt
//! - Each emblem's material parameters are edited through an egui panel
//! - Parameter presets are saved and loaded as JSON

mod app;
mod config;
mod render;
mod scene;
mod ui;

use config::AppConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Emblem Studio");
    log::info!("   Hover an emblem to turn it; press ESC or close window to exit");

    let config = match AppConfig::from_env_and_args() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = app::run(config) {
        log::error!("{}", err);
        std::process::exit(1);
    }

    log::info!("Goodbye!");
}
