//! Headless replay of a lag-compensated firefight
//!
//! Usage: `replay [scenario.ron|scenario.toml]`. Without an argument the
//! built-in duel is played. Set `RUST_LOG=debug` to see every capture.

mod error;
mod scenario;
mod simulation;

use lag_compensation::config::Config;
use lag_compensation::foundation::logging;
use log::info;

use crate::scenario::ScenarioConfig;
use crate::simulation::Replay;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let scenario = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading scenario from {}", path);
            ScenarioConfig::load_from_file(&path)?
        }
        None => {
            info!("No scenario given, playing the built-in duel");
            ScenarioConfig::default()
        }
    };

    let summary = Replay::new(scenario)?.run()?;

    info!(
        "Replay finished after {} ticks: {}/{} shots confirmed with rewind, {} without",
        summary.ticks,
        summary.confirmed(),
        summary.outcomes.len(),
        summary.confirmed_without_rewind()
    );
    Ok(())
}
