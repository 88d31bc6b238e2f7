use anyhow::Context;
use simulation::config::ScenarioConfig;
use simulation::{export, scenario};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), anyhow::Error> {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ScenarioConfig::from_file(&path)
            .with_context(|| format!("loading scenario from {path}"))?,
        None => {
            tracing::info!("no scenario file given, running the reference drain");
            ScenarioConfig::default()
        }
    };

    let report = scenario::run(&config).context("running scenario")?;
    println!("{}", export::export_json(&report)?);

    if !report.invariant_holds {
        tracing::warn!(
            recorded = %report.recorded_total,
            held = %report.held_after,
            "scenario left the ledger insolvent"
        );
    }
    Ok(())
}
