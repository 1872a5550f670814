use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures at the repository boundary. Each one aborts the current action.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("clone failed: {0}")]
    Clone(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("update failed: {0}")]
    Fetch(String),
}

impl RepoError {
    /// Maps a git2 error raised while cloning. Credential problems are
    /// reported as `Auth` regardless of phase.
    pub fn from_clone(err: git2::Error) -> Self {
        if is_auth_error(&err) {
            RepoError::Auth(err.message().to_string())
        } else {
            RepoError::Clone(err.message().to_string())
        }
    }

    pub fn from_fetch(err: git2::Error) -> Self {
        if is_auth_error(&err) {
            RepoError::Auth(err.message().to_string())
        } else {
            RepoError::Fetch(err.message().to_string())
        }
    }
}

fn is_auth_error(err: &git2::Error) -> bool {
    err.code() == git2::ErrorCode::Auth
        || err.code() == git2::ErrorCode::Certificate
        || err.class() == git2::ErrorClass::Ssh && err.message().contains("authentication")
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Anything that aborts loading a repository into a session.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("cannot read commit history: {0}")]
    History(#[from] git2::Error),
}

/// Why a single file could not be copied. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyFailure {
    #[error("source missing")]
    SourceMissing,
    #[error("permission denied")]
    PermissionDenied,
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for CopyFailure {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => CopyFailure::SourceMissing,
            io::ErrorKind::PermissionDenied => CopyFailure::PermissionDenied,
            _ => CopyFailure::Io(err.to_string()),
        }
    }
}
