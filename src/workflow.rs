use crate::selection::{self, SelectionSet};
use crate::session::SessionState;
use crate::{cli, copier, logging, tui};
use anyhow::{Result, bail};
use tracing::{error, info};

/// Headless run: load, filter, copy, report. Returns whether every copy
/// succeeded.
fn run_headless(cli_args: &cli::Cli, session: &mut SessionState) -> Result<bool> {
    let count = session.refresh()?;
    let root = match session.repo() {
        Some(handle) => {
            println!("Loaded {} files from {}", count, handle.url());
            handle.root().to_path_buf()
        }
        None => bail!("repository is not loaded"),
    };

    let visible = session.visible();
    if session.criteria.is_inverted() {
        println!("From date is after To date: no files match.");
    }

    let selection: SelectionSet = if cli_args.all {
        visible.into_iter().map(|r| r.relative_path).collect()
    } else {
        // Explicit paths bypass the index; unknown ones report "source missing".
        cli_args
            .select
            .iter()
            .map(|path| selection::normalize_relative(path))
            .collect()
    };
    if selection.is_empty() {
        println!("No files selected or matched criteria to copy.");
        return Ok(false);
    }

    let results = copier::copy_selected(
        &selection,
        &root,
        &session.config().destination,
        session.config().workers,
    );
    let summary = session.summarize(&results);
    println!("{summary}");
    Ok(!summary.has_failures())
}

// Main orchestrator: pick headless or interactive mode.
pub fn run_repopick(cli_args: cli::Cli) -> Result<bool> {
    let fallback = if cli_args.is_headless() {
        logging::Fallback::Stderr
    } else {
        logging::Fallback::Discard
    };
    let _log_guard = logging::init(cli_args.log_file.as_deref(), cli_args.verbose, fallback)?;

    let mut session = SessionState::new(cli_args.url.clone(), cli_args.session_config());
    session.criteria = cli_args.criteria();
    info!(
        "Starting with clone dir {} and destination {}",
        cli_args.clone_dir.display(),
        session.config().destination.display()
    );

    if cli_args.is_headless() {
        return run_headless(&cli_args, &mut session);
    }

    // Repository errors go to the status bar so the user can fix the URL.
    let startup_error = match session.refresh() {
        Ok(_) => None,
        Err(e) => {
            error!("Initial load failed: {}", e);
            Some(e.to_string())
        }
    };
    tui::run_tui(session, startup_error)?;
    Ok(true)
}
