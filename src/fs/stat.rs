//! Single-object metadata queries, the only place the crate calls `stat`/`lstat`.

use crate::{
    Entry, Result, SearchError,
    util::{NormalizedPath, given_cstring, normalize, split_after_last_parent, validate},
};
use libc::ENOENT;
use std::{
    ffi::OsStr,
    os::unix::ffi::{OsStrExt as _, OsStringExt as _},
};

/**
 Reports whether `path` exists.

 The path goes to `stat` as given, so `missing/..` is missing even though it cleans
 to an existing directory. Only a failure with `ENOENT` counts as missing. Any other
 failure, such as `EACCES` on a locked parent or `ENOTDIR` when a component is a regular
 file, reports the path as existing: an entry the caller cannot inspect is still not
 known to be absent. Empty paths and paths with a NUL byte do not exist.
*/
#[must_use]
pub fn exists(path: &OsStr) -> bool {
    let Ok(cpath) = given_cstring(path) else {
        return false;
    };
    match stat_syscall!(stat, cpath.as_ptr()) {
        Ok(_) => true,
        Err(error) => error.raw_os_error() != Some(ENOENT),
    }
}

/**
 Reads the metadata of `path` itself, without following a final symlink.

 # Errors
 [`SearchError::NotFound`], [`SearchError::Access`] or another classified
 [`SearchError`] when `lstat` fails.
*/
pub fn stat(path: &NormalizedPath) -> Result<Entry> {
    let cpath = path.to_cstring()?;
    stat_syscall!(lstat, cpath.as_ptr())
        .map(|statted| Entry::from_stat(path.clone(), &statted))
        .map_err(|e| SearchError::from_io(path.as_path(), e))
}

/**
 Reads the metadata of whatever `path` resolves to, following symlinks.

 The entry keeps the path as given; its type and size are those of the target.

 # Errors
 As [`stat`], plus [`SearchError::CycleDetected`] for symlink loops.
*/
pub fn stat_follow(path: &NormalizedPath) -> Result<Entry> {
    let cpath = path.to_cstring()?;
    stat_syscall!(stat, cpath.as_ptr())
        .map(|statted| Entry::from_stat(path.clone(), &statted))
        .map_err(|e| SearchError::from_io(path.as_path(), e))
}

/**
 Resolves a search root to the directory the kernel would open for it.

 Everything up to the last `..` component is resolved with `realpath`, so `..` steps
 out of a symlink's target rather than the link and fails when an earlier component is
 missing. What follows is cleaned lexically. A root without `..` is only cleaned.

 # Errors
 [`SearchError::InvalidPath`] for empty input or input containing a NUL byte, or the
 classified failure of `realpath`.
*/
pub fn resolve_root(given: &OsStr) -> Result<NormalizedPath> {
    let raw = given.as_bytes();
    validate(raw)?;
    let Some((through_parent, rest)) = split_after_last_parent(raw) else {
        return normalize(given);
    };

    let physical = std::fs::canonicalize(OsStr::from_bytes(through_parent))
        .map_err(|e| SearchError::from_io(given, e))?;
    let mut bytes = physical.into_os_string().into_vec();
    bytes.extend_from_slice(rest);
    normalize(OsStr::from_bytes(&bytes))
}
