use crate::{
    fs::FileType,
    util::{NormalizedPath, PATH_SEPARATOR},
};
use chrono::{DateTime, Utc};
use core::{fmt, ops::BitOr};
use std::{ffi::OsStr, path::Path};

/// A point in time as the platform reports it: seconds and nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    #[must_use]
    #[inline]
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    /// Converts to a UTC date, `None` if out of chrono's range
    #[must_use]
    #[inline]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.secs, self.nanos)
    }
}

/**
 Platform dependent attribute bits of an [`Entry`].

 On Unix `HIDDEN` means a leading dot, `READONLY` means no write permission bit is
 set for anyone, `SYSTEM` marks devices, pipes and sockets, and `EXECUTABLE` marks
 regular files with any execute bit.
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attributes(u8);

impl Attributes {
    pub const NONE: Self = Self(0);
    pub const HIDDEN: Self = Self(1);
    pub const READONLY: Self = Self(1 << 1);
    pub const SYSTEM: Self = Self(1 << 2);
    pub const EXECUTABLE: Self = Self(1 << 3);

    const NAMES: [(Self, &'static str); 4] = [
        (Self::HIDDEN, "HIDDEN"),
        (Self::READONLY, "READONLY"),
        (Self::SYSTEM, "SYSTEM"),
        (Self::EXECUTABLE, "EXECUTABLE"),
    ];

    #[must_use]
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Derives the attributes from a name and a stat mode
    #[must_use]
    pub(crate) fn from_parts(file_name: &[u8], file_type: FileType, mode: u32) -> Self {
        let mut attrs = Self::NONE;
        if file_name.first() == Some(&b'.') {
            attrs = attrs.union(Self::HIDDEN);
        }
        if mode & 0o222 == 0 {
            attrs = attrs.union(Self::READONLY);
        }
        if file_type.is_special() {
            attrs = attrs.union(Self::SYSTEM);
        }
        if file_type == FileType::RegularFile && mode & 0o111 != 0 {
            attrs = attrs.union(Self::EXECUTABLE);
        }
        attrs
    }
}

impl BitOr for Attributes {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_set();
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                list.entry(&format_args!("{name}"));
            }
        }
        list.finish()
    }
}

/**
 One filesystem object found by a search or a [`stat`](crate::stat) call.

 Entries are snapshots: the metadata is read once, when the entry is created, and
 never refreshed.
*/
#[derive(Clone, PartialEq, Eq)]
pub struct Entry {
    pub(crate) path: NormalizedPath,
    /// Bytes of `path` belonging to the search root plus its separator, 0 outside a search
    pub(crate) search_root_len: usize,
    pub(crate) depth: u32,
    pub(crate) file_type: FileType,
    pub(crate) size: u64,
    pub(crate) modified: Timestamp,
    pub(crate) created: Timestamp,
    pub(crate) accessed: Timestamp,
    pub(crate) attributes: Attributes,
    pub(crate) device: u64,
    pub(crate) inode: u64,
}

impl Entry {
    /// Builds an entry from an `lstat`/`stat` result
    #[allow(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        reason = "sizes are never negative and nanoseconds fit in u32"
    )]
    pub(crate) fn from_stat(path: NormalizedPath, stat: &libc::stat) -> Self {
        let file_type = FileType::from_stat(stat);
        let size: i64 = access_stat!(stat, st_size);
        let mode = u32::from(stat.st_mode);
        let attributes = Attributes::from_parts(path.file_name(), file_type, mode);
        Self {
            search_root_len: 0,
            depth: 0,
            file_type,
            size: if file_type == FileType::RegularFile {
                size as u64
            } else {
                0
            },
            modified: Timestamp::new(
                access_stat!(stat, st_mtime),
                access_stat!(stat, st_mtimensec),
            ),
            created: Timestamp::new(
                access_stat!(stat, st_birthtime),
                access_stat!(stat, st_birthtimensec),
            ),
            accessed: Timestamp::new(
                access_stat!(stat, st_atime),
                access_stat!(stat, st_atimensec),
            ),
            attributes,
            device: access_stat!(stat, st_dev),
            inode: access_stat!(stat, st_ino),
            path,
        }
    }

    /// Records where this entry sits relative to the search that found it
    pub(crate) fn within_search(mut self, root: &NormalizedPath, depth: u32) -> Self {
        self.search_root_len = if root.is_root() {
            1
        } else {
            root.as_bytes().len() + 1
        };
        self.depth = depth;
        self
    }

    /// The absolute, normalised path
    #[must_use]
    #[inline]
    pub const fn path(&self) -> &NormalizedPath {
        &self.path
    }

    #[must_use]
    #[inline]
    pub fn as_path(&self) -> &Path {
        self.path.as_path()
    }

    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.path.as_bytes()
    }

    /// The last path component
    #[must_use]
    #[inline]
    pub fn file_name(&self) -> &[u8] {
        self.path.file_name()
    }

    #[must_use]
    #[inline]
    pub fn file_name_os(&self) -> &OsStr {
        use std::os::unix::ffi::OsStrExt as _;
        OsStr::from_bytes(self.file_name())
    }

    /// The path up to and including the last separator
    #[must_use]
    #[inline]
    pub fn directory(&self) -> &[u8] {
        &self.path.as_bytes()[..self.path.file_name_index()]
    }

    /**
     The directory components leading to this entry, outermost first.

     ```
     let entry = recls::stat("/").unwrap();
     assert_eq!(entry.directory_parts().count(), 0);
     ```
    */
    pub fn directory_parts(&self) -> impl Iterator<Item = &[u8]> {
        self.directory()
            .split(|&b| b == PATH_SEPARATOR)
            .filter(|part| !part.is_empty())
    }

    /// The part of the name after the last dot, `None` for dot-files without another dot
    #[must_use]
    pub fn extension(&self) -> Option<&[u8]> {
        let name = self.file_name();
        let dot = name.iter().rposition(|&b| b == b'.')?;
        (dot > 0).then(|| &name[dot + 1..])
    }

    /// The name without its extension
    #[must_use]
    pub fn stem(&self) -> &[u8] {
        let name = self.file_name();
        match self.extension() {
            Some(ext) => &name[..name.len() - ext.len() - 1],
            None => name,
        }
    }

    /// The path relative to the search root, the full path for entries made by `stat`
    #[must_use]
    #[inline]
    pub fn search_relative_path(&self) -> &[u8] {
        &self.path.as_bytes()[self.search_root_len..]
    }

    /// Levels below the search root, children of the root are at depth 1
    #[must_use]
    #[inline]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    #[inline]
    pub const fn file_type(&self) -> FileType {
        self.file_type
    }

    #[must_use]
    #[inline]
    pub const fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }

    #[must_use]
    #[inline]
    pub const fn is_file(&self) -> bool {
        matches!(self.file_type, FileType::RegularFile)
    }

    #[must_use]
    #[inline]
    pub const fn is_link(&self) -> bool {
        matches!(self.file_type, FileType::Symlink)
    }

    #[must_use]
    #[inline]
    pub const fn is_hidden(&self) -> bool {
        self.attributes.contains(Attributes::HIDDEN)
    }

    #[must_use]
    #[inline]
    pub const fn is_readonly(&self) -> bool {
        self.attributes.contains(Attributes::READONLY)
    }

    /// Size in bytes for regular files, 0 for everything else
    #[must_use]
    #[inline]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    #[inline]
    pub const fn attributes(&self) -> Attributes {
        self.attributes
    }

    #[must_use]
    #[inline]
    pub const fn modified(&self) -> Timestamp {
        self.modified
    }

    /// Birth time where the platform records one, otherwise the last status change
    #[must_use]
    #[inline]
    pub const fn created(&self) -> Timestamp {
        self.created
    }

    #[must_use]
    #[inline]
    pub const fn accessed(&self) -> Timestamp {
        self.accessed
    }

    #[must_use]
    #[inline]
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        self.modified.to_datetime()
    }

    #[must_use]
    #[inline]
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created.to_datetime()
    }

    #[must_use]
    #[inline]
    pub fn accessed_time(&self) -> Option<DateTime<Utc>> {
        self.accessed.to_datetime()
    }

    /// Device and inode, the identity of the underlying object
    #[must_use]
    #[inline]
    pub const fn dev_ino(&self) -> (u64, u64) {
        (self.device, self.inode)
    }
}

impl AsRef<Path> for Entry {
    #[inline]
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.path, f)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("path", &self.path)
            .field("file_type", &self.file_type)
            .field("depth", &self.depth)
            .field("size", &self.size)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

impl From<Entry> for std::path::PathBuf {
    fn from(entry: Entry) -> Self {
        entry.path.as_path().to_path_buf()
    }
}
