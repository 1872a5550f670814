use crate::copier::{self, CopyResult, CopySummary};
use crate::error::RefreshError;
use crate::filter::{self, FilterCriteria, SubdirFilter};
use crate::indexer::{self, DateSource, FileRecord};
use crate::repo::{GitProvider, RepoHandle};
use crate::selection::SelectionSet;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where a session clones to, copies to, and how.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub clone_dir: PathBuf,
    pub destination: PathBuf,
    pub workers: usize,
    pub date_source: DateSource,
    /// Remove whatever repository sits at `clone_dir` and clone anew on the
    /// first refresh.
    pub fresh: bool,
}

/// Everything the interactive shell mutates between key presses.
#[derive(Debug)]
pub struct SessionState {
    config: SessionConfig,
    url: String,
    repo: Option<RepoHandle>,
    records: Vec<FileRecord>,
    pub selection: SelectionSet,
    pub criteria: FilterCriteria,
    /// Set when the URL changed after a clone was made by this session, so
    /// the old clone may be replaced.
    replace_previous_clone: bool,
    /// Cleared once the first fresh clone succeeded.
    fresh_pending: bool,
}

impl SessionState {
    pub fn new(url: impl Into<String>, config: SessionConfig) -> Self {
        Self {
            fresh_pending: config.fresh,
            config,
            url: url.into(),
            repo: None,
            records: Vec::new(),
            selection: SelectionSet::new(),
            criteria: FilterCriteria::default(),
            replace_previous_clone: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn repo(&self) -> Option<&RepoHandle> {
        self.repo.as_ref()
    }

    /// Last indexed records, unfiltered.
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Switches to another repository. Nothing is fetched until the next
    /// [`refresh`](Self::refresh).
    pub fn set_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if url == self.url {
            return;
        }
        self.replace_previous_clone |= self.repo.is_some();
        self.url = url;
        self.repo = None;
        self.records.clear();
        self.selection.clear();
        self.criteria.subdir = SubdirFilter::All;
    }

    /// Clones or updates the repository and re-indexes it. The selection is
    /// cleared; on failure the previous index is discarded too.
    pub fn refresh(&mut self) -> Result<usize, RefreshError> {
        self.selection.clear();
        self.records.clear();
        self.repo = None;

        let provider = GitProvider::new(self.replace_previous_clone)
            .fresh(self.fresh_pending);
        let handle = provider.ensure_repo(&self.url, &self.config.clone_dir)?;
        self.replace_previous_clone = false;
        self.fresh_pending = false;

        let records = match self.config.date_source {
            DateSource::Mtime => indexer::index(handle.root())?,
            DateSource::Commit => {
                let dates = handle.commit_dates()?;
                indexer::index_with_dates(handle.root(), &dates)?
            }
        };
        info!("Loaded {} files from {}", records.len(), self.url);

        if let SubdirFilter::Named(name) = &self.criteria.subdir {
            if !records.iter().any(|r| r.top_subdir == *name) {
                self.criteria.subdir = SubdirFilter::All;
            }
        }
        self.records = records;
        self.repo = Some(handle);
        Ok(self.records.len())
    }

    /// Records passing the current criteria.
    pub fn visible(&self) -> Vec<FileRecord> {
        filter::filter(&self.records, &self.criteria)
    }

    pub fn subdir_choices(&self) -> Vec<String> {
        filter::subdir_choices(&self.records)
    }

    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        filter::date_span(&self.records)
    }

    /// Moves the subdirectory filter `step` places through the choices,
    /// wrapping around.
    pub fn cycle_subdir(&mut self, step: isize) {
        let choices = self.subdir_choices();
        let current = self.criteria.subdir.to_string();
        let pos = choices.iter().position(|c| *c == current).unwrap_or(0) as isize;
        let next = (pos + step).rem_euclid(choices.len() as isize) as usize;
        self.criteria.subdir = SubdirFilter::parse(&choices[next]);
    }

    /// Toggles an indexed path; unknown paths are ignored. Returns whether
    /// the path is selected afterwards.
    pub fn toggle(&mut self, relative_path: &str) -> bool {
        if !self.is_indexed(relative_path) {
            return false;
        }
        self.selection.toggle(relative_path)
    }

    pub fn select_visible(&mut self) {
        for record in self.visible() {
            self.selection.insert(record.relative_path);
        }
    }

    pub fn deselect_visible(&mut self) {
        for record in self.visible() {
            self.selection.remove(&record.relative_path);
        }
    }

    fn is_indexed(&self, relative_path: &str) -> bool {
        self.records.iter().any(|r| r.relative_path == relative_path)
    }

    fn repo_root(&self) -> &Path {
        self.repo
            .as_ref()
            .map(RepoHandle::root)
            .unwrap_or(self.config.clone_dir.as_path())
    }

    /// Copies the current selection and returns per-file results.
    pub fn copy_selection(&self) -> Vec<CopyResult> {
        copier::copy_selected(
            &self.selection,
            self.repo_root(),
            &self.config.destination,
            self.config.workers,
        )
    }

    pub fn summarize(&self, results: &[CopyResult]) -> CopySummary {
        CopySummary::new(&self.config.destination, results)
    }
}
