use crate::error::IndexError;
use chrono::{DateTime, Local};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, warn};

/// `top_subdir` of files sitting directly in the repository root.
pub const ROOT_SUBDIR: &str = "(root)";

const VCS_DIR: &str = ".git";

/// Where `modified_at` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DateSource {
    /// Filesystem modification time of the checked-out file.
    #[default]
    Mtime,
    /// Time of the last commit touching the file.
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Relative to the repository root, `/`-separated.
    pub relative_path: String,
    pub top_subdir: String,
    pub modified_at: DateTime<Local>,
}

impl FileRecord {
    pub fn new(relative_path: impl Into<String>, modified_at: DateTime<Local>) -> Self {
        let relative_path = relative_path.into();
        let top_subdir = top_subdir_of(&relative_path);
        Self {
            relative_path,
            top_subdir,
            modified_at,
        }
    }
}

fn top_subdir_of(relative_path: &str) -> String {
    match relative_path.split_once('/') {
        Some((first, _)) => first.to_string(),
        None => ROOT_SUBDIR.to_string(),
    }
}

/// Walks the working tree under `repo_root` and returns one record per
/// regular file, dated by filesystem modification time.
pub fn index(repo_root: &Path) -> Result<Vec<FileRecord>, IndexError> {
    scan_records(repo_root, None)
}

/// Like [`index`], but files found in `commit_dates` take that date instead
/// of their modification time.
pub fn index_with_dates(
    repo_root: &Path,
    commit_dates: &HashMap<String, DateTime<Local>>,
) -> Result<Vec<FileRecord>, IndexError> {
    scan_records(repo_root, Some(commit_dates))
}

fn scan_records(
    repo_root: &Path,
    commit_dates: Option<&HashMap<String, DateTime<Local>>>,
) -> Result<Vec<FileRecord>, IndexError> {
    // Surfaces a missing or unreadable root instead of an empty index.
    fs::read_dir(repo_root).map_err(|source| IndexError::Io {
        path: repo_root.to_path_buf(),
        source,
    })?;

    let walker = WalkBuilder::new(repo_root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(std::cmp::Ord::cmp)
        .filter_entry(|entry| entry.file_name() != VCS_DIR)
        .build();

    let mut records = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(relative_path) = relative_key(repo_root, path) else {
            warn!("Skipping {}: not representable as a relative path", path.display());
            continue;
        };

        let modified_at = match commit_dates.and_then(|dates| dates.get(&relative_path)) {
            Some(date) => *date,
            None => match entry
                .metadata()
                .map_err(|e| e.to_string())
                .and_then(|m| m.modified().map_err(|e| e.to_string()))
            {
                Ok(time) => DateTime::<Local>::from(time),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            },
        };

        records.push(FileRecord::new(relative_path, modified_at));
    }

    debug!("Indexed {} files under {}", records.len(), repo_root.display());
    Ok(records)
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
