use crate::error::CopyFailure;
use crate::selection::SelectionSet;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::fmt;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Success,
    Failure(CopyFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResult {
    pub relative_path: String,
    pub outcome: CopyOutcome,
}

impl CopyResult {
    pub fn is_success(&self) -> bool {
        self.outcome == CopyOutcome::Success
    }
}

/// Copies every selected path from `repo_root` to the same relative location
/// under `destination_root`, using at most `workers` threads.
///
/// Every path is attempted; the call returns once all of them have finished,
/// with exactly one result per selected path.
pub fn copy_selected(
    selection: &SelectionSet,
    repo_root: &Path,
    destination_root: &Path,
    workers: usize,
) -> Vec<CopyResult> {
    let paths: Vec<&str> = selection.iter().collect();
    if paths.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, paths.len());
    info!(
        "Copying {} file(s) to {} with {} worker(s)",
        paths.len(),
        destination_root.display(),
        workers
    );

    let copy_all = || -> Vec<CopyResult> {
        paths
            .par_iter()
            .map(|rel| copy_one(repo_root, destination_root, rel))
            .collect()
    };

    let results = match ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("repopick-copy-{i}"))
        .build()
    {
        Ok(pool) => pool.install(copy_all),
        Err(e) => {
            warn!("Cannot start copy workers ({}), copying sequentially", e);
            paths
                .iter()
                .map(|rel| copy_one(repo_root, destination_root, rel))
                .collect()
        }
    };

    let failed = results.iter().filter(|r| !r.is_success()).count();
    info!("Copy finished: {} ok, {} failed", results.len() - failed, failed);
    results
}

fn copy_one(repo_root: &Path, destination_root: &Path, relative_path: &str) -> CopyResult {
    let outcome = match copy_file(repo_root, destination_root, relative_path) {
        Ok(()) => {
            debug!("Copied {}", relative_path);
            CopyOutcome::Success
        }
        Err(failure) => {
            warn!("Failed to copy {}: {}", relative_path, failure);
            CopyOutcome::Failure(failure)
        }
    };
    CopyResult {
        relative_path: relative_path.to_string(),
        outcome,
    }
}

fn copy_file(
    repo_root: &Path,
    destination_root: &Path,
    relative_path: &str,
) -> Result<(), CopyFailure> {
    let rel = checked_relative(relative_path)?;
    let source = repo_root.join(&rel);
    let target = destination_root.join(&rel);

    let metadata = fs::metadata(&source)?;
    if !metadata.is_file() {
        return Err(CopyFailure::Io("source is not a regular file".to_string()));
    }

    if let Some(parent) = target.parent() {
        // Tolerates a sibling worker creating the same directory first.
        fs::create_dir_all(parent)?;
    }

    // A read-only copy from an earlier run must not block the overwrite.
    if let Ok(existing) = fs::metadata(&target) {
        let mut permissions = existing.permissions();
        if permissions.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
            fs::set_permissions(&target, permissions)?;
        }
    }

    fs::copy(&source, &target)?;

    if let Ok(modified) = metadata.modified() {
        if let Err(e) = set_modified(&target, modified) {
            debug!("Could not keep modification time of {}: {}", relative_path, e);
        }
    }
    Ok(())
}

fn set_modified(path: &Path, modified: std::time::SystemTime) -> std::io::Result<()> {
    let file = match File::options().write(true).open(path) {
        Ok(file) => file,
        Err(_) => File::open(path)?,
    };
    file.set_modified(modified)
}

/// Rejects absolute paths, anything that would step outside the root, and
/// `.` components, which would let two spellings race onto one target.
fn checked_relative(relative_path: &str) -> Result<PathBuf, CopyFailure> {
    let path = Path::new(relative_path);
    if relative_path.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(CopyFailure::Io("path escapes repository root".to_string()));
    }
    if path.components().any(|c| c == Component::CurDir) {
        return Err(CopyFailure::Io("path is not normalized".to_string()));
    }
    Ok(path.to_path_buf())
}

/// Aggregate view of a copy batch for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub destination: PathBuf,
    pub succeeded: usize,
    pub failed: Vec<(String, CopyFailure)>,
}

impl CopySummary {
    pub fn new(destination: &Path, results: &[CopyResult]) -> Self {
        let mut summary = CopySummary {
            destination: destination.to_path_buf(),
            ..Default::default()
        };
        for result in results {
            match &result.outcome {
                CopyOutcome::Success => summary.succeeded += 1,
                CopyOutcome::Failure(reason) => summary
                    .failed
                    .push((result.relative_path.clone(), reason.clone())),
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// First line only, for a one-line status bar.
    pub fn headline(&self) -> String {
        let mut line = format!(
            "Copied {} file(s) to {}",
            self.succeeded,
            self.destination.display()
        );
        if self.has_failures() {
            line.push_str(&format!(", {} failed", self.failed.len()));
        }
        line
    }
}

impl fmt::Display for CopySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Copied {} file(s) to {}",
            self.succeeded,
            self.destination.display()
        )?;
        if self.has_failures() {
            write!(f, "\n{} failed:", self.failed.len())?;
            for (path, reason) in &self.failed {
                write!(f, "\n  {path}: {reason}")?;
            }
        }
        Ok(())
    }
}
