use crate::{Result, SearchError, fs::FileType, util::NormalizedPath};
use core::{ffi::CStr, ptr::NonNull};
use libc::DIR;

/// One name read from a directory, before any stat call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChild {
    pub(crate) name: Box<[u8]>,
    pub(crate) file_type: FileType,
}

impl RawChild {
    #[must_use]
    pub fn new(name: &[u8], file_type: FileType) -> Self {
        Self {
            name: name.into(),
            file_type,
        }
    }

    #[must_use]
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// The type from the listing, [`FileType::Unknown`] when the filesystem gives none
    #[must_use]
    #[inline]
    pub const fn file_type(&self) -> FileType {
        self.file_type
    }
}

/// Zeroes `errno` so a null from `readdir` can be told apart from end of stream
#[inline]
fn clear_errno() {
    #[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "redox"))]
    // SAFETY: always returns a valid pointer to this thread's errno
    unsafe {
        *libc::__errno_location() = 0;
    }
    #[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
    // SAFETY: as above
    unsafe {
        *libc::__errno() = 0;
    }
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    // SAFETY: as above
    unsafe {
        *libc::__error() = 0;
    }
}

/**
 An open directory stream yielding its children through `readdir`.

 `.` and `..` are skipped. Children come in the order the filesystem reports them,
 which is not sorted and may differ between runs. The stream is not restartable.

 The underlying `DIR` handle is closed when the reader is dropped, whether it was
 read to the end or abandoned part way.
*/
#[derive(Debug)]
pub struct DirReader {
    dir: NonNull<DIR>,
    path: NormalizedPath,
    finished: bool,
}

// SAFETY: the DIR stream is owned exclusively by this reader and only touched through `&mut self`
unsafe impl Send for DirReader {}

impl DirReader {
    /**
     Opens `path` for listing.

     # Errors
     [`SearchError::NotFound`], [`SearchError::Access`], [`SearchError::NotADirectory`]
     or [`SearchError::Io`] from `opendir`.
    */
    pub fn open(path: &NormalizedPath) -> Result<Self> {
        let cpath = path.to_cstring()?;
        // SAFETY: `cpath` is NUL terminated
        let dir = unsafe { libc::opendir(cpath.as_ptr()) };
        let Some(dir) = NonNull::new(dir) else {
            return Err(SearchError::from_io(
                path.as_path(),
                std::io::Error::last_os_error(),
            ));
        };
        Ok(Self {
            dir,
            path: path.clone(),
            finished: false,
        })
    }

    /// The directory being listed
    #[must_use]
    #[inline]
    pub const fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// Reads the next raw `dirent`, `Ok(None)` at the end of the stream
    fn read_raw(&mut self) -> Result<Option<RawChild>> {
        clear_errno();
        // SAFETY: `self.dir` stays open until drop
        let drnt = unsafe { libc::readdir(self.dir.as_ptr()) };
        if drnt.is_null() {
            let error = std::io::Error::last_os_error();
            return match error.raw_os_error() {
                None | Some(0) => Ok(None),
                Some(_) => Err(SearchError::from_io(self.path.as_path(), error)),
            };
        }

        #[allow(clippy::multiple_unsafe_ops_per_block)]
        // SAFETY: readdir returned a valid entry which lives until the next readdir call,
        // and we copy the name out before then
        let child = unsafe {
            let name = CStr::from_ptr(access_dirent!(drnt, d_name)).to_bytes();
            RawChild::new(name, FileType::from_dtype(access_dirent!(drnt, d_type)))
        };
        Ok(Some(child))
    }
}

impl Iterator for DirReader {
    type Item = Result<RawChild>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.read_raw() {
                Ok(Some(child)) if matches!(&*child.name, b"." | b"..") => {}
                Ok(Some(child)) => return Some(Ok(child)),
                Ok(None) => self.finished = true,
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }
        }
        None
    }
}

impl core::iter::FusedIterator for DirReader {}

impl Drop for DirReader {
    fn drop(&mut self) {
        // SAFETY: the stream was opened by `open` and is closed exactly once, here
        unsafe { libc::closedir(self.dir.as_ptr()) };
    }
}
