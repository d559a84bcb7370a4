//! Driver Monitor - Main Entry Point
//!
//! Usage: `driver-monitor [CONFIG.toml] [--no-autostart]`

use api::{init_logging, run_server, settings::Settings};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config_path = std::env::var_os("DRIVER_MONITOR_CONFIG").map(PathBuf::from);
    let mut autostart = true;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--no-autostart" => autostart = false,
            path => config_path = Some(PathBuf::from(path)),
        }
    }

    let settings = Settings::load(config_path.as_deref())?;
    init_logging(&settings.logging)?;

    info!("=== Driver Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Source: {:?} at {} fps, alerts {}",
        settings.source.kind,
        settings.source.fps,
        if autostart { "on at startup" } else { "off until started" }
    );

    run_server(settings, autostart).await
}
