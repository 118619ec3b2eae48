use libc::{EACCES, ELOOP, ENOENT, ENOTDIR, EPERM};
use std::{io, path::PathBuf};
use thiserror::Error;

/// Generic result type for search operations
pub type Result<T> = core::result::Result<T, SearchError>;

/**
 Errors produced while validating a search or touching the filesystem.

 Errors on the search root are returned straight from [`crate::search_start`].
 The same variants met mid-traversal are recorded as
 [`TraversalWarning`](crate::TraversalWarning)s and the walk carries on,
 see [`SearchError::is_recoverable`].
*/
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid path {path:?}: empty or contains a NUL byte")]
    InvalidPath { path: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    PatternSyntax { pattern: String, reason: String },

    #[error("{}: no such file or directory", path.display())]
    NotFound { path: PathBuf },

    #[error("{}: access denied", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("{}: directory cycle detected", path.display())]
    CycleDetected { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SearchError {
    /**
     Classifies an OS error raised while operating on `path`.

     `ENOENT` maps to [`SearchError::NotFound`], `EACCES`/`EPERM` to
     [`SearchError::Access`], `ENOTDIR` to [`SearchError::NotADirectory`] and
     `ELOOP` to [`SearchError::CycleDetected`]. Anything else is kept as
     [`SearchError::Io`].
    */
    pub fn from_io<P: Into<PathBuf>>(path: P, error: io::Error) -> Self {
        let path = path.into();
        match error.raw_os_error() {
            Some(ENOENT) => Self::NotFound { path },
            Some(EACCES | EPERM) => Self::Access {
                path,
                source: error,
            },
            Some(ENOTDIR) => Self::NotADirectory { path },
            Some(ELOOP) => Self::CycleDetected { path },
            _ => Self::Io {
                path,
                source: error,
            },
        }
    }

    /// The path this error occurred at, if there is one.
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotFound { path }
            | Self::Access { path, .. }
            | Self::NotADirectory { path }
            | Self::CycleDetected { path }
            | Self::Io { path, .. } => Some(path),
            Self::InvalidPath { .. } | Self::PatternSyntax { .. } => None,
        }
    }

    /**
     Whether a traversal can continue past this error.

     Filesystem errors only cost the subtree they occurred in. Invalid paths and
     patterns are configuration errors and stop the search before it starts.
    */
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidPath { .. } | Self::PatternSyntax { .. })
    }
}
