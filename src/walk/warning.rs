use crate::SearchError;
use core::fmt;
use std::path::{Path, PathBuf};

/// A directory or entry that was skipped part way through a search, and why
#[derive(Debug)]
pub struct TraversalWarning {
    pub(crate) path: PathBuf,
    pub(crate) error: SearchError,
}

impl TraversalWarning {
    pub(crate) fn new<P: Into<PathBuf>>(path: P, error: SearchError) -> Self {
        let warning = Self {
            path: path.into(),
            error,
        };
        log::warn!("skipping {}", warning.error);
        warning
    }

    /// The directory that could not be read, or the entry that could not be inspected
    #[must_use]
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    #[inline]
    pub const fn error(&self) -> &SearchError {
        &self.error
    }
}

impl fmt::Display for TraversalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped {}", self.error)
    }
}
