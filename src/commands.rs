//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

/// Runs a set of calls against a REST API and checks for conditions over the results.
#[derive(Parser, Debug)]
#[command(name = "rest-api-tests", version, long_about = None)]
pub struct Args {
    /// Targeted engine (e.g. quickwit, elasticsearch)
    #[arg(long)]
    pub engine: Option<String>,

    /// Prefixes selecting the scenarios to run; all scenarios run when absent
    #[arg(long = "test", num_args = 0..)]
    pub tests: Vec<String>,

    /// Service binary to start locally for the duration of the run
    #[arg(long)]
    pub binary: Option<PathBuf>,

    /// Scenario root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}
