//! Headless Lumen host.
//!
//! Runs the scripted engine against synthetic peripherals and a headless
//! surface, then prints tick statistics.
//!
//! ```text
//! lumen_host [config.toml]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use lumen::{logging, Host, HostConfig, SyntheticPlatform, TickStats, DEFAULT_CONFIG_PATH};
use lumen_core::HostResult;
use lumen_engine::{HeadlessSurface, ScriptedEngine};

fn main() -> ExitCode {
    match run() {
        Ok(stats) => {
            println!("{stats}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("lumen_host: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> HostResult<TickStats> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = HostConfig::load(&path)?;
    logging::init(&config.logging)?;

    let script = config.engine.script.clone();
    let synthetic = config.synthetic;
    let host = Host::start(
        &config,
        move || ScriptedEngine::new(script),
        || {
            let mut surface = HeadlessSurface::new();
            surface.make_current();
            surface
        },
        |ctx| SyntheticPlatform::new(ctx, synthetic),
    )?;

    std::thread::sleep(Duration::from_secs(config.run.seconds));
    for failure in host.drain_peripheral_failures() {
        tracing::warn!(error = %failure, "peripheral unavailable during run");
    }
    host.stop()
}
