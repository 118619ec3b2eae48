/*!
 Recursive, lazy, cancellable filesystem search.

 A search is described by a [`SearchSpec`] (built with [`SearchBuilder`], or from
 [`SearchOptions`] through [`search_start`]) and run by a [`SearchHandle`], a pull based
 iterator that yields one [`Entry`] per call and holds at most one open directory per
 level of the tree.

 ```no_run
 use recls::{EntryTypes, SearchOptions, search_start};

 let options = SearchOptions {
     entry_types: EntryTypes::BOTH,
     ..SearchOptions::default()
 };
 let mut search = search_start("/usr/include", "*.h|*.hpp", options).unwrap();
 while let Some(entry) = search.next_entry() {
     println!("{} {}", entry.size(), entry.search_relative_path().escape_ascii());
 }
 for warning in search.warnings() {
     eprintln!("{warning}");
 }
 ```

 Unreadable subdirectories, and entries whose metadata cannot be read, never stop a
 search: they are skipped, logged at `warn` level through the `log` facade, and kept
 in [`SearchHandle::warnings`].
*/

#[macro_use]
mod macros;

mod error;
mod filters;
mod fs;
mod util;
mod walk;

#[cfg(test)]
mod test;

pub use error::{Result, SearchError};
pub use filters::{EntryTypes, EntryTypesParser};
pub use fs::{
    Attributes, DirReader, Entry, FileSystem, FileType, NativeFs, RawChild, Timestamp,
};
pub use util::{
    Matcher, NormalizedPath, PATH_SEPARATOR, PATTERN_SEPARATOR, Printer, WILDCARDS_ALL,
    count_separators, join, normalize,
};
pub use walk::{
    CancelToken, SearchBuilder, SearchHandle, SearchOptions, SearchSpec, TraversalWarning,
};

use core::ops::ControlFlow;
use std::ffi::OsStr;

const_assert!(
    size_of::<libc::ino_t>() <= size_of::<u64>(),
    "inode numbers must fit in a u64"
);

/**
 Starts a search of `root` for names matching `pattern`.

 # Errors
 [`SearchError::InvalidPath`] or [`SearchError::PatternSyntax`] for bad input,
 [`SearchError::NotFound`], [`SearchError::Access`] or [`SearchError::NotADirectory`]
 when the root cannot be opened.
*/
pub fn search_start<P: AsRef<OsStr>>(
    root: P,
    pattern: &str,
    options: SearchOptions,
) -> Result<SearchHandle> {
    SearchHandle::start(SearchBuilder::from_options(root, pattern, options).build()?)
}

/**
 Reports whether `path` exists.

 The path is checked as spelt, without cleaning, so `missing/..` does not exist.
 Only "not found" counts as missing: a path that cannot be inspected, because of
 permissions or because a component is not a directory, is reported as existing.
 Invalid paths (empty, or containing NUL) do not exist.

 ```
 assert!(!recls::path_exists("/definitely/missing"));
 assert!(!recls::path_exists("/definitely/missing/.."));
 assert!(recls::path_exists("/"));
 ```
*/
#[must_use]
pub fn path_exists<P: AsRef<OsStr>>(path: P) -> bool {
    NativeFs.exists(path.as_ref())
}

/**
 Reads the metadata of `path` without following a final symlink.

 # Errors
 [`SearchError::InvalidPath`], or the classified failure of `lstat`.
*/
pub fn stat<P: AsRef<OsStr>>(path: P) -> Result<Entry> {
    fs::stat(&normalize(path)?)
}

/**
 Reads the metadata of what `path` points to, following symlinks.

 # Errors
 As [`stat`].
*/
pub fn stat_follow<P: AsRef<OsStr>>(path: P) -> Result<Entry> {
    fs::stat_follow(&normalize(path)?)
}

/**
 Runs a whole search, handing each entry to `callback`.

 Returning [`ControlFlow::Break`] from the callback cancels the search. Returns the
 number of entries passed to the callback.

 # Errors
 As [`SearchHandle::start`].

 ```no_run
 use core::ops::ControlFlow;
 use recls::{SearchBuilder, search_process};

 let spec = SearchBuilder::new("/var/log").pattern("*.log").build().unwrap();
 let mut first = None;
 search_process(spec, |entry| {
     first = Some(entry.clone());
     ControlFlow::Break(())
 })
 .unwrap();
 ```
*/
pub fn search_process<F>(spec: SearchSpec, mut callback: F) -> Result<u64>
where
    F: FnMut(&Entry) -> ControlFlow<()>,
{
    let mut search = SearchHandle::start(spec)?;
    let mut processed = 0;
    while let Some(entry) = search.next_entry() {
        processed += 1;
        if callback(&entry).is_break() {
            search.cancel();
        }
    }
    Ok(processed)
}

/**
 Total size in bytes of the regular files under `path`, recursively.

 Hidden files count; symlinks are not followed. Unreadable subdirectories are skipped.

 # Errors
 As [`SearchHandle::start`].
*/
pub fn calc_directory_size<P: AsRef<OsStr>>(path: P) -> Result<u64> {
    let spec = SearchBuilder::new(path)
        .entry_types(EntryTypes::FILES)
        .build()?;
    Ok(SearchHandle::start(spec)?.map(|entry| entry.size()).sum())
}
