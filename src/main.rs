mod cli;
mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use crate::cli::Cli;

/// Build the log filter: program messages follow `--debug`, classifier
/// messages follow `--verbose` (raised to debug by `--debug`).
fn log_filter(debug: bool, verbose: u8) -> String {
    let program = if debug { "debug" } else { "info" };
    let classifier = match (verbose, debug) {
        (v, _) if v >= 3 => "trace",
        (2, _) | (_, true) => "debug",
        (1, false) => "info",
        _ => "warn",
    };
    format!("warn,canopy={program},canopy_io={program},canopy_rf={classifier}")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.debug, cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.n_streams)
        .build_global()
        .context("failed to configure thread pool")?;
    info!(threads = cli.n_streams, "thread pool configured");

    let forest = cli
        .forest_config()
        .context("invalid classifier parameters")?;
    let run = cli.run_config();

    match pipeline::run(&run, &forest)? {
        Some(path) => info!(path = %path.display(), "predictions written"),
        None => debug!("no output written"),
    }
    Ok(())
}
