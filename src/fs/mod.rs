//! The platform layer: everything that touches the operating system goes through here.

mod entry;
mod file_type;
mod reader;
mod stat;

pub use entry::{Attributes, Entry, Timestamp};
pub use file_type::FileType;
pub use reader::{DirReader, RawChild};
pub use stat::{exists, resolve_root, stat, stat_follow};

use crate::{Result, util::NormalizedPath};
use std::ffi::OsStr;

/**
 The operations a search needs from a filesystem.

 The traversal engine only talks to the filesystem through this trait, so it never
 branches on the platform. [`NativeFs`] is the real implementation; tests wrap it to
 count open directory handles or inject failures.
*/
pub trait FileSystem {
    /// A lazy listing of one directory, releasing its handle when dropped
    type Reader: Iterator<Item = Result<RawChild>>;

    /// The byte separating path components, counted to find an entry's depth
    const SEPARATOR: u8 = crate::util::PATH_SEPARATOR;

    /// Opens a directory for listing
    ///
    /// # Errors
    /// Not found, access denied, not a directory, or any other I/O failure.
    fn open_dir(&self, path: &NormalizedPath) -> Result<Self::Reader>;

    /// Reads metadata, following a final symlink when `follow` is set
    ///
    /// # Errors
    /// Any classified stat failure.
    fn stat(&self, path: &NormalizedPath, follow: bool) -> Result<Entry>;

    /// Turns the root a caller gave into the directory to search, as [`resolve_root`] does
    ///
    /// # Errors
    /// An invalid path, or any classified failure resolving it.
    fn resolve_root(&self, given: &OsStr) -> Result<NormalizedPath>;

    /// Existence of a path as the caller spelt it, with the conservative policy of [`exists`]
    fn exists(&self, path: &OsStr) -> bool;
}

/// The host filesystem, accessed through libc
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

impl FileSystem for NativeFs {
    type Reader = DirReader;

    #[inline]
    fn open_dir(&self, path: &NormalizedPath) -> Result<DirReader> {
        DirReader::open(path)
    }

    #[inline]
    fn stat(&self, path: &NormalizedPath, follow: bool) -> Result<Entry> {
        if follow {
            stat_follow(path)
        } else {
            stat(path)
        }
    }

    #[inline]
    fn resolve_root(&self, given: &OsStr) -> Result<NormalizedPath> {
        resolve_root(given)
    }

    #[inline]
    fn exists(&self, path: &OsStr) -> bool {
        exists(path)
    }
}
