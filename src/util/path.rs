use crate::{Result, SearchError};
use core::fmt;
use std::{
    ffi::{CString, OsStr},
    os::unix::ffi::{OsStrExt as _, OsStringExt as _},
    path::Path,
};

/// The separator between path components on this platform
pub const PATH_SEPARATOR: u8 = b'/';

const_assert!(PATH_SEPARATOR.is_ascii(), "separator must be a single byte");

/**
 An absolute path with no empty, `.` or `..` components and no trailing separator
 (the root `/` excepted).

 Only [`normalize`] and [`join`] construct one, so every value upholds that shape
 and contains no NUL byte. Normalising a normalised path is the identity.

 ```
 use recls::{join, normalize};

 let base = normalize("/usr//local/./lib/../share/").unwrap();
 assert_eq!(base.as_bytes(), b"/usr/local/share");

 let joined = join(&base, "doc").unwrap();
 assert_eq!(joined.as_bytes(), b"/usr/local/share/doc");
 assert_eq!(normalize(joined.as_os_str()).unwrap(), joined);
 ```
*/
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    bytes: Box<[u8]>,
}

impl NormalizedPath {
    /// The path as raw bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    #[must_use]
    pub fn as_os_str(&self) -> &OsStr {
        OsStr::from_bytes(&self.bytes)
    }

    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(self.as_os_str())
    }

    /// Whether this is the filesystem root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        *self.bytes == [PATH_SEPARATOR]
    }

    /// Index of the first byte of the last component
    #[inline]
    #[must_use]
    pub fn file_name_index(&self) -> usize {
        self.bytes
            .iter()
            .rposition(|&b| b == PATH_SEPARATOR)
            .map_or(0, |pos| pos + 1)
    }

    /// The last component, empty for the root
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &[u8] {
        &self.bytes[self.file_name_index()..]
    }

    /// Number of components below the root, `/` is 0 and `/a/b` is 2
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        if self.is_root() {
            0
        } else {
            count_separators(&self.bytes)
        }
    }

    /**
     Appends a single directory entry name.

     Names handed out by the directory reader never contain a separator and are never
     `.` or `..`, so no further cleaning is needed.
    */
    #[must_use]
    pub(crate) fn child(&self, name: &[u8]) -> Self {
        debug_assert!(
            !name.is_empty() && !name.contains(&PATH_SEPARATOR) && !name.contains(&0),
            "child names are single components"
        );
        let mut bytes = Vec::with_capacity(self.bytes.len() + 1 + name.len());
        bytes.extend_from_slice(&self.bytes);
        if !self.is_root() {
            bytes.push(PATH_SEPARATOR);
        }
        bytes.extend_from_slice(name);
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// A NUL terminated copy for libc calls
    ///
    /// # Errors
    /// Never fails for a value built by this module, the check is kept for the type system.
    pub fn to_cstring(&self) -> Result<CString> {
        CString::new(self.bytes.to_vec()).map_err(|_| SearchError::InvalidPath {
            path: self.to_string(),
        })
    }
}

impl AsRef<Path> for NormalizedPath {
    #[inline]
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl AsRef<OsStr> for NormalizedPath {
    #[inline]
    fn as_ref(&self) -> &OsStr {
        self.as_os_str()
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_path().display())
    }
}

impl fmt::Debug for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_os_str(), f)
    }
}

/// Rejects the inputs no platform call could accept
pub(crate) fn validate(raw: &[u8]) -> Result<()> {
    if raw.is_empty() || raw.contains(&0) {
        return Err(SearchError::InvalidPath {
            path: String::from_utf8_lossy(raw).into_owned(),
        });
    }
    Ok(())
}

/// Collapses separators, drops `.` and resolves `..` against the components seen so far
fn clean(absolute: &[u8]) -> NormalizedPath {
    let mut parts: Vec<&[u8]> = Vec::new();
    for part in absolute.split(|&b| b == PATH_SEPARATOR) {
        match part {
            b"" | b"." => {}
            b".." => {
                // `..` at the root stays at the root
                parts.pop();
            }
            name => parts.push(name),
        }
    }

    let mut bytes = Vec::with_capacity(absolute.len());
    if parts.is_empty() {
        bytes.push(PATH_SEPARATOR);
    }
    for part in parts {
        bytes.push(PATH_SEPARATOR);
        bytes.extend_from_slice(part);
    }
    NormalizedPath {
        bytes: bytes.into_boxed_slice(),
    }
}

/**
 A NUL terminated copy of `path` exactly as the caller spelt it, relative parts and
 `..` included.

 # Errors
 [`SearchError::InvalidPath`] for empty input or input containing a NUL byte.
*/
pub(crate) fn given_cstring(path: &OsStr) -> Result<CString> {
    let raw = path.as_bytes();
    validate(raw)?;
    CString::new(raw).map_err(|_| SearchError::InvalidPath {
        path: String::from_utf8_lossy(raw).into_owned(),
    })
}

/// Splits `raw` just after its last `..` component, `None` when it has none
pub(crate) fn split_after_last_parent(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut split = None;
    let mut start = 0;
    for part in raw.split(|&b| b == PATH_SEPARATOR) {
        let end = start + part.len();
        if part == b".." {
            split = Some(end);
        }
        start = end + 1;
    }
    split.map(|idx| raw.split_at(idx))
}

/**
 Canonicalises a path string without touching the filesystem beyond reading the
 current directory for relative input.

 Repeated and trailing separators are dropped, `.` components removed and `..`
 resolved lexically. Symlinks are not resolved.

 # Errors
 [`SearchError::InvalidPath`] for empty input or input containing a NUL byte,
 [`SearchError::Io`] if a relative path is given and the current directory cannot be read.
*/
pub fn normalize<P: AsRef<OsStr>>(path: P) -> Result<NormalizedPath> {
    let raw = path.as_ref().as_bytes();
    validate(raw)?;

    if raw.first() == Some(&PATH_SEPARATOR) {
        return Ok(clean(raw));
    }

    let cwd = std::env::current_dir().map_err(|e| SearchError::from_io(".", e))?;
    let mut absolute = cwd.into_os_string().into_vec();
    absolute.push(PATH_SEPARATOR);
    absolute.extend_from_slice(raw);
    Ok(clean(&absolute))
}

/**
 Appends `component` to `base` and normalises the result.

 The component may itself contain separators or `..`; an absolute component is still
 treated as relative to `base`.

 # Errors
 [`SearchError::InvalidPath`] if `component` is empty or contains a NUL byte.
*/
pub fn join<C: AsRef<OsStr>>(base: &NormalizedPath, component: C) -> Result<NormalizedPath> {
    let raw = component.as_ref().as_bytes();
    validate(raw)?;

    let mut combined = Vec::with_capacity(base.bytes.len() + 1 + raw.len());
    combined.extend_from_slice(&base.bytes);
    combined.push(PATH_SEPARATOR);
    combined.extend_from_slice(raw);
    Ok(clean(&combined))
}

/**
 Counts occurrences of the path separator in `range`.

 Applied to a normalised path this is its depth below the root, which is how the
 traversal enforces depth limits.

 ```
 use recls::count_separators;
 assert_eq!(count_separators(b"/usr/local/bin"), 3);
 assert_eq!(count_separators(b"file.txt"), 0);
 ```
*/
#[inline]
#[must_use]
pub fn count_separators(range: &[u8]) -> usize {
    range.iter().filter(|&&b| b == PATH_SEPARATOR).count()
}
