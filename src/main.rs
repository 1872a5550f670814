mod cli;
mod copier;
mod error;
mod filter;
mod indexer;
mod logging;
mod repo;
mod selection;
mod session;
mod tui;
mod workflow;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli_args = cli::Cli::parse();

    // Delegate the main application logic to the workflow module
    if workflow::run_repopick(cli_args)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
