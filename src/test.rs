#![allow(clippy::unwrap_used)]
use crate::{
    DirReader, Entry, EntryTypes, FileSystem, FileType, NativeFs, NormalizedPath, RawChild,
    Result, SearchBuilder, SearchError, SearchHandle, SearchOptions, SearchSpec,
    calc_directory_size, normalize, path_exists, search_process, search_start,
};
use core::{cell::Cell, ops::ControlFlow};
use filetime::{FileTime, set_file_mtime};
use std::{
    ffi::OsStr,
    fs,
    os::unix::fs::{PermissionsExt as _, symlink},
    path::Path,
    rc::Rc,
};
use tempfile::TempDir;

/// Builds a tree from relative paths, names ending in `/` are directories
fn tree(paths: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for path in paths {
        let full = dir.path().join(path.trim_end_matches('/'));
        if path.ends_with('/') {
            fs::create_dir_all(&full).unwrap();
        } else {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&full, path.as_bytes()).unwrap();
        }
    }
    dir
}

fn spec(root: &Path) -> SearchBuilder {
    SearchBuilder::new(root)
}

fn relative(entry: &Entry) -> String {
    String::from_utf8_lossy(entry.search_relative_path()).into_owned()
}

/// Relative paths of everything the search yields, sorted
fn collect(spec: SearchSpec) -> Vec<String> {
    let mut found: Vec<String> = SearchHandle::start(spec)
        .unwrap()
        .map(|e| relative(&e))
        .collect();
    found.sort();
    found
}

fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions
    unsafe { libc::geteuid() == 0 }
}

/// Counts directory handles opened through it and still alive
#[derive(Default, Clone)]
struct CountingFs {
    open: Rc<Cell<usize>>,
    peak: Rc<Cell<usize>>,
}

struct CountingReader {
    inner: DirReader,
    open: Rc<Cell<usize>>,
}

impl Iterator for CountingReader {
    type Item = Result<RawChild>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl Drop for CountingReader {
    fn drop(&mut self) {
        self.open.set(self.open.get() - 1);
    }
}

impl FileSystem for CountingFs {
    type Reader = CountingReader;

    fn open_dir(&self, path: &NormalizedPath) -> Result<CountingReader> {
        let inner = NativeFs.open_dir(path)?;
        self.open.set(self.open.get() + 1);
        self.peak.set(self.peak.get().max(self.open.get()));
        Ok(CountingReader {
            inner,
            open: Rc::clone(&self.open),
        })
    }

    fn stat(&self, path: &NormalizedPath, follow: bool) -> Result<Entry> {
        NativeFs.stat(path, follow)
    }

    fn resolve_root(&self, given: &OsStr) -> Result<NormalizedPath> {
        NativeFs.resolve_root(given)
    }

    fn exists(&self, path: &OsStr) -> bool {
        NativeFs.exists(path)
    }
}

/// Refuses to open directories with a given name, as if their permissions forbade it
struct DenyingFs {
    denied: &'static [u8],
}

impl FileSystem for DenyingFs {
    type Reader = DirReader;

    fn open_dir(&self, path: &NormalizedPath) -> Result<DirReader> {
        if path.file_name() == self.denied {
            return Err(SearchError::from_io(
                path.as_path(),
                std::io::Error::from_raw_os_error(libc::EACCES),
            ));
        }
        NativeFs.open_dir(path)
    }

    fn stat(&self, path: &NormalizedPath, follow: bool) -> Result<Entry> {
        NativeFs.stat(path, follow)
    }

    fn resolve_root(&self, given: &OsStr) -> Result<NormalizedPath> {
        NativeFs.resolve_root(given)
    }

    fn exists(&self, path: &OsStr) -> bool {
        NativeFs.exists(path)
    }
}

/// Fails `lstat` on one name, and can drop the types a listing reports
struct FailingStatFs {
    failing: &'static [u8],
    hide_types: bool,
}

struct TypelessReader {
    inner: DirReader,
    hide_types: bool,
}

impl Iterator for TypelessReader {
    type Item = Result<RawChild>;

    fn next(&mut self) -> Option<Self::Item> {
        let hide_types = self.hide_types;
        self.inner.next().map(|child| {
            child.map(|child| {
                if hide_types {
                    RawChild::new(child.name(), FileType::Unknown)
                } else {
                    child
                }
            })
        })
    }
}

impl FileSystem for FailingStatFs {
    type Reader = TypelessReader;

    fn open_dir(&self, path: &NormalizedPath) -> Result<TypelessReader> {
        Ok(TypelessReader {
            inner: NativeFs.open_dir(path)?,
            hide_types: self.hide_types,
        })
    }

    fn stat(&self, path: &NormalizedPath, follow: bool) -> Result<Entry> {
        if path.file_name() == self.failing {
            return Err(SearchError::from_io(
                path.as_path(),
                std::io::Error::from_raw_os_error(libc::EACCES),
            ));
        }
        NativeFs.stat(path, follow)
    }

    fn resolve_root(&self, given: &OsStr) -> Result<NormalizedPath> {
        NativeFs.resolve_root(given)
    }

    fn exists(&self, path: &OsStr) -> bool {
        NativeFs.exists(path)
    }
}

#[test]
fn empty_root_ends_immediately() {
    let dir = tree(&[]);
    let mut search = SearchHandle::start(spec(dir.path()).build().unwrap()).unwrap();
    assert!(search.next_entry().is_none());
    assert!(search.warnings().is_empty());
    assert_eq!(search.visited(), 0);
    assert!(search.is_closed());
}

#[test]
fn no_matches_still_visits_every_child() {
    let dir = tree(&["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"]);
    let mut search =
        SearchHandle::start(spec(dir.path()).pattern("*.rs").build().unwrap()).unwrap();
    assert!(search.next_entry().is_none());
    assert_eq!(search.visited(), 5);
}

#[test]
fn recursive_search_finds_nested_files() {
    let dir = tree(&["top.txt", "a/mid.txt", "a/b/deep.txt", "a/b/skip.md"]);
    let found = collect(spec(dir.path()).pattern("*.txt").build().unwrap());
    assert_eq!(found, vec!["a/b/deep.txt", "a/mid.txt", "top.txt"]);
}

#[test]
fn directories_are_descended_even_when_they_do_not_match() {
    let dir = tree(&["src/lib.rs", "src/util/path.rs", "README.md"]);
    let found = collect(
        spec(dir.path())
            .pattern("*.rs")
            .entry_types(EntryTypes::BOTH)
            .build()
            .unwrap(),
    );
    assert_eq!(found, vec!["src/lib.rs", "src/util/path.rs"]);
}

#[test]
fn directories_come_before_their_contents() {
    let dir = tree(&["a/b/c/file", "a/other", "x/y/"]);
    let order: Vec<String> = SearchHandle::start(
        spec(dir.path())
            .entry_types(EntryTypes::BOTH)
            .build()
            .unwrap(),
    )
    .unwrap()
    .map(|e| relative(&e))
    .collect();

    let position = |p: &str| order.iter().position(|o| o == p).unwrap();
    assert!(position("a") < position("a/b"));
    assert!(position("a/b") < position("a/b/c"));
    assert!(position("a/b/c") < position("a/b/c/file"));
    assert!(position("a") < position("a/other"));
    assert!(position("x") < position("x/y"));
    assert_eq!(order.len(), 7);
}

#[test]
fn yielded_paths_are_unique() {
    let dir = tree(&["a/1", "a/2", "b/1", "b/c/1", "1"]);
    let spec = spec(dir.path()).entry_types(EntryTypes::ALL).build().unwrap();
    let found = collect(spec);
    let mut deduped = found.clone();
    deduped.dedup();
    assert_eq!(found, deduped);
    assert_eq!(found.len(), 8);
}

#[test]
fn non_recursive_lists_only_the_top() {
    let dir = tree(&["one.txt", "sub/two.txt"]);
    let found = collect(
        spec(dir.path())
            .recursive(false)
            .entry_types(EntryTypes::BOTH)
            .build()
            .unwrap(),
    );
    assert_eq!(found, vec!["one.txt", "sub"]);
}

#[test]
fn depth_limit_stops_descent() {
    let dir = tree(&["1.txt", "a/2.txt", "a/b/3.txt", "a/b/c/4.txt"]);
    let found = collect(spec(dir.path()).max_depth(Some(2)).build().unwrap());
    assert_eq!(found, vec!["1.txt", "a/2.txt"]);

    let unlimited = collect(spec(dir.path()).max_depth(Some(0)).build().unwrap());
    assert_eq!(unlimited.len(), 4);
}

#[test]
fn entries_know_their_depth_and_root() {
    let dir = tree(&["a/b/leaf.dat"]);
    let entry = SearchHandle::start(spec(dir.path()).build().unwrap())
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(entry.depth(), 3);
    assert_eq!(entry.search_relative_path(), b"a/b/leaf.dat");
    assert_eq!(entry.file_name(), b"leaf.dat");
    assert_eq!(entry.extension(), Some(&b"dat"[..]));
    assert!(entry.is_file());
    assert_eq!(entry.size(), "a/b/leaf.dat".len() as u64);
    let root = normalize(dir.path()).unwrap();
    assert!(entry.as_bytes().starts_with(root.as_bytes()));
}

#[test]
fn pattern_lists_and_case() {
    let dir = tree(&["Main.RS", "lib.rs", "Cargo.toml", "notes.txt"]);
    let sensitive = collect(spec(dir.path()).pattern("*.rs|*.toml").build().unwrap());
    assert_eq!(sensitive, vec!["Cargo.toml", "lib.rs"]);

    let insensitive = collect(
        spec(dir.path())
            .pattern("*.rs|*.toml")
            .case_sensitive(false)
            .build()
            .unwrap(),
    );
    assert_eq!(insensitive, vec!["Cargo.toml", "Main.RS", "lib.rs"]);

    let classes = collect(spec(dir.path()).pattern("[a-m]*.?s").build().unwrap());
    assert_eq!(classes, vec!["lib.rs"]);
}

#[test]
fn entry_type_filters() {
    let dir = tree(&["file", "dir/inner"]);
    symlink(dir.path().join("file"), dir.path().join("link")).unwrap();

    let dirs = collect(
        spec(dir.path())
            .entry_types(EntryTypes::DIRECTORIES)
            .build()
            .unwrap(),
    );
    assert_eq!(dirs, vec!["dir"]);

    let links = collect(spec(dir.path()).entry_types(EntryTypes::LINKS).build().unwrap());
    assert_eq!(links, vec!["link"]);

    let files = collect(spec(dir.path()).build().unwrap());
    assert_eq!(files, vec!["dir/inner", "file"]);
}

#[test]
fn hidden_entries_can_be_skipped() {
    let dir = tree(&[".hidden", ".git/config", "visible", "sub/.secret", "sub/plain"]);
    let shown = collect(spec(dir.path()).build().unwrap());
    assert_eq!(shown.len(), 5);

    let mut search = SearchHandle::start(spec(dir.path()).show_hidden(false).build().unwrap())
        .unwrap();
    let mut hidden_off: Vec<String> = search.by_ref().map(|e| relative(&e)).collect();
    hidden_off.sort();
    assert_eq!(hidden_off, vec!["sub/plain", "visible"]);
    // four children of the root and two of sub, .git is never opened
    assert_eq!(search.visited(), 6);
}

#[test]
fn hidden_attribute_is_reported() {
    let dir = tree(&[".dotfile"]);
    let entry = SearchHandle::start(spec(dir.path()).build().unwrap())
        .unwrap()
        .next()
        .unwrap();
    assert!(entry.is_hidden());
}

#[test]
fn excluded_directories_are_not_descended() {
    let dir = tree(&["src/main.rs", "target/debug/build.rs", "target.rs"]);
    let found = collect(
        spec(dir.path())
            .pattern("*.rs")
            .exclude("target")
            .build()
            .unwrap(),
    );
    assert_eq!(found, vec!["src/main.rs", "target.rs"]);
}

#[test]
fn cancel_after_first_yield_releases_every_handle() {
    let dir = tree(&["a/b/c/1", "a/b/c/2", "a/b/3", "d/4", "5"]);
    let fs = CountingFs::default();
    let mut search =
        SearchHandle::with_filesystem(fs.clone(), spec(dir.path()).build().unwrap()).unwrap();

    assert!(search.next_entry().is_some());
    assert!(fs.open.get() >= 1);
    search.cancel();
    assert!(search.next_entry().is_none());
    assert_eq!(fs.open.get(), 0);
    assert_eq!(search.open_frames(), 0);
    assert!(search.next_entry().is_none());
}

#[test]
fn dropping_a_search_releases_handles() {
    let dir = tree(&["a/b/c/deep"]);
    let fs = CountingFs::default();
    {
        let mut search = SearchHandle::with_filesystem(
            fs.clone(),
            spec(dir.path()).entry_types(EntryTypes::BOTH).build().unwrap(),
        )
        .unwrap();
        // stop part way down, with frames still open
        search.next_entry().unwrap();
        search.next_entry().unwrap();
        assert!(fs.open.get() >= 2);
    }
    assert_eq!(fs.open.get(), 0);
}

#[test]
fn open_handles_are_bounded_by_depth() {
    let mut wide: Vec<String> = (0..50).map(|i| format!("f{i}")).collect();
    wide.push("d1/d2/d3/d4/d5/".into());
    let paths: Vec<&str> = wide.iter().map(String::as_str).collect();
    let dir = tree(&paths);

    let fs = CountingFs::default();
    let search =
        SearchHandle::with_filesystem(fs.clone(), spec(dir.path()).build().unwrap()).unwrap();
    assert_eq!(search.count(), 50);
    // the root and five nested directories
    assert_eq!(fs.peak.get(), 6);
    assert_eq!(fs.open.get(), 0);
}

#[test]
fn close_is_idempotent() {
    let dir = tree(&["a/1", "b/2"]);
    let mut search = SearchHandle::start(spec(dir.path()).build().unwrap()).unwrap();
    search.next_entry();
    search.close();
    search.close();
    assert!(search.is_closed());
    assert!(search.next_entry().is_none());

    let mut exhausted = SearchHandle::start(spec(dir.path()).build().unwrap()).unwrap();
    while exhausted.next_entry().is_some() {}
    exhausted.close();
    assert!(exhausted.is_closed());
}

#[test]
fn cancel_token_works_across_threads() {
    let dir = tree(&["1", "2", "3"]);
    let mut search = SearchHandle::start(spec(dir.path()).build().unwrap()).unwrap();
    let token = search.cancel_token();
    std::thread::spawn(move || token.cancel()).join().unwrap();
    assert!(search.cancel_token().is_cancelled());
    assert!(search.next_entry().is_none());
}

#[test]
fn unreadable_directory_is_skipped_with_a_warning() {
    let dir = tree(&["locked/secret.txt", "open/visible.txt", "top.txt"]);
    let mut search = SearchHandle::with_filesystem(
        DenyingFs { denied: b"locked" },
        spec(dir.path()).build().unwrap(),
    )
    .unwrap();
    let mut found: Vec<String> = search.by_ref().map(|e| relative(&e)).collect();
    found.sort();
    assert_eq!(found, vec!["open/visible.txt", "top.txt"]);

    let warnings = search.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].path().ends_with("locked"));
    assert!(matches!(warnings[0].error(), SearchError::Access { .. }));
    assert!(warnings[0].error().is_recoverable());
}

#[test]
fn entries_that_cannot_be_inspected_are_warned_about() {
    let dir = tree(&["top.txt", "gone.txt", "sub/inner.txt"]);
    // with the listing's types, and with every type left to lstat
    for hide_types in [false, true] {
        let fs = FailingStatFs {
            failing: b"gone.txt",
            hide_types,
        };
        let mut search = SearchHandle::with_filesystem(fs, spec(dir.path()).build().unwrap())
            .unwrap();
        let mut found: Vec<String> = search.by_ref().map(|e| relative(&e)).collect();
        found.sort();
        assert_eq!(found, vec!["sub/inner.txt", "top.txt"], "hide_types={hide_types}");

        let warnings = search.warnings();
        assert_eq!(warnings.len(), 1, "hide_types={hide_types}");
        assert!(warnings[0].path().ends_with("gone.txt"));
        assert!(matches!(warnings[0].error(), SearchError::Access { .. }));
    }
}

#[test]
fn permission_denied_subtree_is_skipped() {
    if running_as_root() {
        // root ignores mode bits
        return;
    }
    let dir = tree(&[
        "locked/secret.txt",
        "locked/inner/deeper.txt",
        "sibling/a.txt",
        "sibling/b/c.txt",
    ]);
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let mut search = SearchHandle::start(spec(dir.path()).build().unwrap()).unwrap();
    let mut found: Vec<String> = search.by_ref().map(|e| relative(&e)).collect();
    found.sort();
    let warning_count = search.warnings().len();
    let access_denied = search
        .warnings()
        .first()
        .is_some_and(|w| matches!(w.error(), SearchError::Access { .. }));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    assert_eq!(found, vec!["sibling/a.txt", "sibling/b/c.txt"]);
    assert_eq!(warning_count, 1);
    assert!(access_denied);
}

#[test]
fn root_errors_are_fatal() {
    let dir = tree(&["plain.txt"]);
    assert!(matches!(
        SearchHandle::start(spec(&dir.path().join("missing")).build().unwrap()),
        Err(SearchError::NotFound { .. })
    ));
    assert!(matches!(
        SearchHandle::start(spec(&dir.path().join("plain.txt")).build().unwrap()),
        Err(SearchError::NotADirectory { .. })
    ));
    assert!(matches!(
        search_start(dir.path(), "[", SearchOptions::default()),
        Err(SearchError::PatternSyntax { .. })
    ));
    assert!(matches!(
        search_start("", "*", SearchOptions::default()),
        Err(SearchError::InvalidPath { .. })
    ));
    // cleaning would turn this into the temporary directory itself
    assert!(matches!(
        search_start(dir.path().join("missing/.."), "*", SearchOptions::default()),
        Err(SearchError::NotFound { .. })
    ));
    assert!(matches!(
        search_start(dir.path().join("plain.txt/.."), "*", SearchOptions::default()),
        Err(SearchError::NotADirectory { .. })
    ));
}

#[test]
fn parent_steps_in_the_root_leave_symlink_targets() {
    let dir = tree(&["deep/inner/here.txt", "deep/sibling.txt", "top.txt"]);
    symlink(dir.path().join("deep/inner"), dir.path().join("shortcut")).unwrap();

    let mut search = search_start(dir.path().join("shortcut/.."), "*", SearchOptions::default())
        .unwrap();
    let mut found: Vec<String> = search.by_ref().map(|e| relative(&e)).collect();
    found.sort();
    assert_eq!(found, vec!["inner/here.txt", "sibling.txt"]);
    assert!(search.spec().root().as_bytes().ends_with(b"/deep"));
    assert_eq!(
        search.spec().given_root(),
        dir.path().join("shortcut/..").as_os_str()
    );
}

#[test]
fn search_start_uses_options() {
    let dir = tree(&["a.c", "b.h", "inc/c.h", "inc/sys/"]);
    let options = SearchOptions {
        entry_types: EntryTypes::BOTH,
        max_depth: Some(1),
        ..SearchOptions::default()
    };
    let mut found: Vec<String> = search_start(dir.path(), "*.h|inc", options)
        .unwrap()
        .map(|e| relative(&e))
        .collect();
    found.sort();
    assert_eq!(found, vec!["b.h", "inc"]);
}

#[test]
fn symlinks_are_not_followed_by_default() {
    let dir = tree(&["real/file.txt"]);
    symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();
    let found = collect(spec(dir.path()).build().unwrap());
    assert_eq!(found, vec!["real/file.txt"]);
}

#[test]
fn following_symlinks_descends_into_targets() {
    let outside = tree(&["target.txt"]);
    let dir = tree(&["local.txt"]);
    symlink(outside.path(), dir.path().join("linked")).unwrap();

    let found = collect(spec(dir.path()).follow_symlinks(true).build().unwrap());
    assert_eq!(found, vec!["linked/target.txt", "local.txt"]);
}

#[test]
fn symlink_loops_end_with_a_cycle_warning() {
    let dir = tree(&["a/file.txt"]);
    symlink(dir.path(), dir.path().join("a/back_to_root")).unwrap();

    let mut search =
        SearchHandle::start(spec(dir.path()).follow_symlinks(true).build().unwrap()).unwrap();
    let found: Vec<String> = search.by_ref().map(|e| relative(&e)).collect();
    assert_eq!(found, vec!["a/file.txt"]);
    assert_eq!(search.warnings().len(), 1);
    assert!(matches!(
        search.warnings()[0].error(),
        SearchError::CycleDetected { .. }
    ));
}

#[test]
fn dangling_links_are_yielded_as_links_but_not_followed() {
    let dir = tree(&[]);
    symlink(dir.path().join("nowhere"), dir.path().join("dangling")).unwrap();
    let mut search = SearchHandle::start(
        spec(dir.path())
            .follow_symlinks(true)
            .entry_types(EntryTypes::ALL)
            .build()
            .unwrap(),
    )
    .unwrap();
    let entry = search.next_entry().unwrap();
    assert!(entry.is_link());
    assert!(search.next_entry().is_none());
    assert!(search.warnings().is_empty());
}

#[test]
fn modification_times_are_reported() {
    let dir = tree(&["stamped"]);
    let file = dir.path().join("stamped");
    set_file_mtime(&file, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();

    let entry = SearchHandle::start(spec(dir.path()).build().unwrap())
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(entry.modified().secs, 1_000_000_000);
    assert_eq!(entry.modified_time().unwrap().timestamp(), 1_000_000_000);
}

#[test]
fn search_process_counts_until_break() {
    let dir = tree(&["1", "2", "3", "4"]);
    let all = search_process(spec(dir.path()).build().unwrap(), |_| ControlFlow::Continue(()))
        .unwrap();
    assert_eq!(all, 4);

    let mut seen = Vec::new();
    let first = search_process(spec(dir.path()).build().unwrap(), |entry| {
        seen.push(entry.clone());
        ControlFlow::Break(())
    })
    .unwrap();
    assert_eq!(first, 1);
    assert_eq!(seen.len(), 1);
}

#[test]
fn directory_size_sums_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::write(dir.path().join("one"), [0_u8; 100]).unwrap();
    fs::write(dir.path().join("a/two"), [0_u8; 200]).unwrap();
    fs::write(dir.path().join("a/b/.three"), [0_u8; 300]).unwrap();
    symlink(dir.path().join("one"), dir.path().join("link")).unwrap();

    assert_eq!(calc_directory_size(dir.path()).unwrap(), 600);
}

#[test]
fn path_existence_is_conservative() {
    let dir = tree(&["file.txt"]);
    assert!(!path_exists("/definitely/missing"));
    assert!(path_exists(dir.path()));
    assert!(path_exists(dir.path().join("file.txt")));
    // ENOTDIR, not ENOENT
    assert!(path_exists(dir.path().join("file.txt/child")));
    assert!(!path_exists(""));
    // the kernel sees `missing` before it sees `..`
    assert!(!path_exists(dir.path().join("missing/../file.txt")));
    assert!(path_exists(dir.path().join("./file.txt")));
}

#[test]
fn native_fs_reads_the_host() {
    assert_eq!(NativeFs::SEPARATOR, b'/');
    let root = normalize("/").unwrap();
    assert!(NativeFs.exists(OsStr::new("/")));
    assert!(NativeFs.stat(&root, false).unwrap().is_dir());
    assert_eq!(NativeFs.resolve_root(OsStr::new("/..")).unwrap(), root);
}
