//! Delinquency Report - command line entry point

use anyhow::Result;
use clap::Parser;
use delinquency_report::{app, cli::Cli};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();
    debug!("started with verbosity level: {}", cli.verbose);

    let settings = cli.settings()?;
    let analysis = app::run(&cli.input, &settings)?;

    info!(
        "done: {} clients, {} observations, {} month groups -> {}",
        analysis.tables.clients.len(),
        analysis.tables.delinquency.len(),
        analysis.summary.len(),
        settings.output_dir.display()
    );
    Ok(())
}
