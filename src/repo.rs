use crate::error::RepoError;
use chrono::{DateTime, Local, TimeZone};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Config, Cred, CredentialType, ErrorCode, FetchOptions, RemoteCallbacks,
    Repository, Sort,
};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A clone that was successfully created or brought up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    root: PathBuf,
    url: String,
}

impl RepoHandle {
    /// Working tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Last commit time for every path touched in the history reachable from
    /// HEAD. Paths use `/` separators, relative to the working tree root.
    pub fn commit_dates(&self) -> Result<HashMap<String, DateTime<Local>>, git2::Error> {
        let repo = Repository::open(&self.root)?;
        let mut dates = HashMap::new();

        let mut walk = repo.revwalk()?;
        walk.set_sorting(Sort::TIME)?;
        match walk.push_head() {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Ok(dates);
            }
            Err(e) => return Err(e),
        }

        for oid in walk {
            let commit = repo.find_commit(oid?)?;
            let tree = commit.tree()?;
            let parent_tree = if commit.parent_count() > 0 {
                Some(commit.parent(0)?.tree()?)
            } else {
                None
            };
            let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

            let Some(when) = Local.timestamp_opt(commit.time().seconds(), 0).single() else {
                continue;
            };
            for delta in diff.deltas() {
                if let Some(path) = delta.new_file().path() {
                    // Newest commit is visited first.
                    dates
                        .entry(path.to_string_lossy().into_owned())
                        .or_insert(when);
                }
            }
        }

        debug!("Collected commit dates for {} paths", dates.len());
        Ok(dates)
    }
}

/// Clones repositories or brings existing clones up to date.
#[derive(Debug, Clone, Default)]
pub struct GitProvider {
    /// Remove a clone of a different repository sitting at the local path
    /// instead of refusing to touch it.
    pub replace_foreign_clone: bool,
    /// Remove any repository at the local path and clone anew.
    pub fresh: bool,
}

impl GitProvider {
    pub fn new(replace_foreign_clone: bool) -> Self {
        Self {
            replace_foreign_clone,
            fresh: false,
        }
    }

    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    /// Clones `url` into `local_path` if nothing is there yet, otherwise
    /// fetches `origin` and fast-forwards the checked-out branch.
    ///
    /// A non-empty directory that is not a repository is never touched and
    /// yields `RepoError::Clone`, even when `fresh` is set.
    pub fn ensure_repo(&self, url: &str, local_path: &Path) -> Result<RepoHandle, RepoError> {
        if url.trim().is_empty() {
            return Err(RepoError::Clone("repository URL is empty".to_string()));
        }

        if !local_path.exists() || dir_is_empty(local_path) {
            return clone_repo(url, local_path);
        }

        let repo = Repository::open(local_path).map_err(|_| {
            RepoError::Clone(format!(
                "destination not empty: {} exists and is not a repository",
                local_path.display()
            ))
        })?;

        if self.fresh {
            drop(repo);
            return reclone(url, local_path);
        }

        let origin_url = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(str::to_string));
        if origin_url.as_deref() != Some(url) {
            if !self.replace_foreign_clone {
                return Err(RepoError::Clone(format!(
                    "{} holds a clone of {}",
                    local_path.display(),
                    origin_url.as_deref().unwrap_or("an unknown remote")
                )));
            }
            drop(repo);
            info!("Replacing clone of {:?}", origin_url);
            return reclone(url, local_path);
        }

        pull(&repo)?;
        Ok(RepoHandle {
            root: workdir_of(&repo, local_path),
            url: url.to_string(),
        })
    }
}

fn clone_repo(url: &str, local_path: &Path) -> Result<RepoHandle, RepoError> {
    info!("Cloning {} into {}", url, local_path.display());
    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options());
    let repo = builder
        .clone(url, local_path)
        .map_err(RepoError::from_clone)?;

    Ok(RepoHandle {
        root: workdir_of(&repo, local_path),
        url: url.to_string(),
    })
}

fn reclone(url: &str, local_path: &Path) -> Result<RepoHandle, RepoError> {
    info!("Removing repository at {}", local_path.display());
    remove_directory(local_path).map_err(|e| {
        RepoError::Clone(format!("cannot remove {}: {}", local_path.display(), e))
    })?;
    clone_repo(url, local_path)
}

fn pull(repo: &Repository) -> Result<(), RepoError> {
    let mut remote = repo.find_remote("origin").map_err(RepoError::from_fetch)?;
    info!("Fetching origin ({})", remote.url().unwrap_or("?"));
    remote
        .fetch::<&str>(&[], Some(&mut fetch_options()), None)
        .map_err(RepoError::from_fetch)?;

    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            debug!("HEAD is unborn, nothing to fast-forward");
            return Ok(());
        }
        Err(e) => return Err(RepoError::from_fetch(e)),
    };
    if !head.is_branch() {
        return Err(RepoError::Fetch("HEAD is detached".to_string()));
    }
    let branch_name = head
        .shorthand()
        .ok_or_else(|| RepoError::Fetch("branch name is not valid UTF-8".to_string()))?
        .to_string();
    let ref_name = head
        .name()
        .ok_or_else(|| RepoError::Fetch("reference name is not valid UTF-8".to_string()))?
        .to_string();

    let upstream = match repo
        .find_branch(&branch_name, BranchType::Local)
        .and_then(|branch| branch.upstream())
    {
        Ok(upstream) => upstream.into_reference(),
        Err(_) => repo
            .find_reference(&format!("refs/remotes/origin/{branch_name}"))
            .map_err(RepoError::from_fetch)?,
    };
    let fetched = repo
        .reference_to_annotated_commit(&upstream)
        .map_err(RepoError::from_fetch)?;

    let (analysis, _) = repo
        .merge_analysis(&[&fetched])
        .map_err(RepoError::from_fetch)?;

    if analysis.is_up_to_date() {
        debug!("{} is up to date", branch_name);
        Ok(())
    } else if analysis.is_fast_forward() {
        info!("Fast-forwarding {} to {}", branch_name, fetched.id());
        let mut reference = repo
            .find_reference(&ref_name)
            .map_err(RepoError::from_fetch)?;
        reference
            .set_target(fetched.id(), "repopick: fast-forward")
            .map_err(RepoError::from_fetch)?;
        repo.set_head(&ref_name).map_err(RepoError::from_fetch)?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))
            .map_err(RepoError::from_fetch)
    } else {
        Err(RepoError::Fetch(format!(
            "local branch {branch_name} has diverged from origin"
        )))
    }
}

fn fetch_options<'a>() -> FetchOptions<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0u32;
    callbacks.credentials(move |url, username, allowed| {
        // libgit2 keeps asking while credentials are rejected.
        attempts += 1;
        if attempts > 3 {
            return Err(git2::Error::new(
                ErrorCode::Auth,
                git2::ErrorClass::Callback,
                "credentials rejected",
            ));
        }
        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = Config::open_default()?;
            return Cred::credential_helper(&config, url, username);
        }
        Cred::default()
    });
    callbacks.transfer_progress(|stats| {
        if stats.received_objects() == stats.total_objects() {
            debug!("Received {} objects", stats.total_objects());
        }
        true
    });

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

fn workdir_of(repo: &Repository, fallback: &Path) -> PathBuf {
    repo.workdir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf())
}

fn dir_is_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

/// Removes a directory tree, clearing read-only flags when the first attempt
/// is refused.
fn remove_directory(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!("Retrying removal of {} after clearing read-only flags", path.display());
            for entry in WalkBuilder::new(path).standard_filters(false).build().flatten() {
                let Ok(metadata) = entry.path().symlink_metadata() else {
                    continue;
                };
                let mut permissions = metadata.permissions();
                if permissions.readonly() {
                    #[allow(clippy::permissions_set_readonly_false)]
                    permissions.set_readonly(false);
                    let _ = fs::set_permissions(entry.path(), permissions);
                }
            }
            fs::remove_dir_all(path)
        }
        other => other,
    }
}
