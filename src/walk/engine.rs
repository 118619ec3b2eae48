use crate::{
    Entry, Result, SearchError,
    fs::{FileSystem, FileType, RawChild},
    util::NormalizedPath,
    walk::{SearchSpec, TraversalWarning},
};
use std::collections::HashSet;

/// An open directory on the frontier
struct Frame<R> {
    reader: R,
    path: NormalizedPath,
}

/**
 Depth-first, pre-order traversal over an explicit stack of open directories.

 Each call to [`Traversal::next_entry`] reads children from the top frame until one
 passes the filters. A directory chosen for descent is not opened straight away:
 it is parked in `pending` and opened at the start of the following pull, so the
 directory itself is yielded before anything beneath it.

 At most one directory handle is open per level of the frontier.
*/
pub(crate) struct Traversal<F: FileSystem> {
    fs: F,
    spec: SearchSpec,
    frames: Vec<Frame<F::Reader>>,
    pending: Option<NormalizedPath>,
    /// Bytes of the root every path on the frontier starts with, 0 for `/`
    root_prefix: usize,
    /// (device, inode) of every directory entered, only filled when following symlinks
    entered: HashSet<(u64, u64)>,
    warnings: Vec<TraversalWarning>,
    visited: u64,
}

impl<F: FileSystem> Traversal<F> {
    /// Resolves and opens the root; failures here end the search before it starts
    pub(crate) fn start(fs: F, mut spec: SearchSpec) -> Result<Self> {
        spec.root = fs.resolve_root(&spec.given_root)?;
        let reader = fs.open_dir(&spec.root)?;
        let mut entered = HashSet::new();
        if spec.follow_symlinks
            && let Ok(root) = fs.stat(&spec.root, true)
        {
            entered.insert(root.dev_ino());
        }
        log::debug!("starting search of {} for '{}'", spec.root, spec.pattern());

        let root_prefix = if spec.root.is_root() {
            0
        } else {
            spec.root.as_bytes().len()
        };
        let root = Frame {
            reader,
            path: spec.root.clone(),
        };
        Ok(Self {
            fs,
            spec,
            frames: vec![root],
            pending: None,
            root_prefix,
            entered,
            warnings: Vec::new(),
            visited: 0,
        })
    }

    /// Produces the next matching entry, `None` once the frontier is empty
    pub(crate) fn next_entry(&mut self) -> Option<Entry> {
        loop {
            if let Some(dir) = self.pending.take() {
                self.push_frame(dir);
            }

            let frame = self.frames.last_mut()?;
            let child = match frame.reader.next() {
                Some(Ok(child)) => child,
                Some(Err(error)) => {
                    self.warnings
                        .push(TraversalWarning::new(frame.path.as_path(), error));
                    self.pop_frame();
                    continue;
                }
                None => {
                    self.pop_frame();
                    continue;
                }
            };
            let path = frame.path.child(child.name());
            self.visited += 1;

            if let Some(entry) = self.inspect(&child, path) {
                return Some(entry);
            }
        }
    }

    /// Decides descent and yield for one child
    fn inspect(&mut self, child: &RawChild, path: NormalizedPath) -> Option<Entry> {
        let name = child.name();
        log::trace!("inspecting {path}");
        if self.spec.hides(name) || self.spec.is_excluded(name) {
            return None;
        }

        let depth = self.depth_of(&path);
        let mut statted = None;
        let file_type = match child.file_type() {
            FileType::Unknown => match self.fs.stat(&path, false) {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    statted = Some(entry);
                    file_type
                }
                Err(error) => {
                    self.warnings
                        .push(TraversalWarning::new(path.as_path(), error));
                    return None;
                }
            },
            known => known,
        };

        if self.should_descend(&path, file_type, depth) {
            self.pending = Some(path.clone());
        }

        if !(self.spec.matcher.matches(name) && self.spec.entry_types.matches(file_type)) {
            return None;
        }

        let entry = match statted {
            Some(entry) => entry,
            None => match self.fs.stat(&path, false) {
                Ok(entry) => entry,
                Err(error) => {
                    self.warnings
                        .push(TraversalWarning::new(path.as_path(), error));
                    return None;
                }
            },
        };
        Some(entry.within_search(&self.spec.root, depth))
    }

    /**
     Whether a child at `depth` should become a frame.

     With symlink following on, the target's (device, inode) is recorded and a second
     visit is refused with a [`SearchError::CycleDetected`] warning.
    */
    fn should_descend(&mut self, path: &NormalizedPath, file_type: FileType, depth: u32) -> bool {
        if !self.spec.recursive || self.spec.max_depth.is_some_and(|max| depth >= max.get()) {
            return false;
        }

        match file_type {
            FileType::Directory if !self.spec.follow_symlinks => true,
            FileType::Directory | FileType::Symlink if self.spec.follow_symlinks => {
                match self.fs.stat(path, true) {
                    Ok(target) if target.is_dir() => {
                        if self.entered.insert(target.dev_ino()) {
                            true
                        } else {
                            self.warnings.push(TraversalWarning::new(
                                path.as_path(),
                                SearchError::CycleDetected {
                                    path: path.as_path().to_path_buf(),
                                },
                            ));
                            false
                        }
                    }
                    Ok(_) => false,
                    Err(error @ SearchError::CycleDetected { .. }) => {
                        self.warnings
                            .push(TraversalWarning::new(path.as_path(), error));
                        false
                    }
                    Err(error) => {
                        // dangling links end up here
                        log::debug!("not following {path}: {error}");
                        false
                    }
                }
            }
            _ => false,
        }
    }

    fn push_frame(&mut self, path: NormalizedPath) {
        match self.fs.open_dir(&path) {
            Ok(reader) => {
                log::debug!("entering {path}");
                self.frames.push(Frame { reader, path });
            }
            Err(error) => self
                .warnings
                .push(TraversalWarning::new(path.as_path(), error)),
        }
    }

    fn pop_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            log::debug!("leaving {}", frame.path);
        }
    }

    /// Levels below the root, children of the root are at depth 1
    fn depth_of(&self, path: &NormalizedPath) -> u32 {
        let below = path
            .as_bytes()
            .get(self.root_prefix..)
            .map_or(0, |rest| rest.iter().filter(|&&b| b == F::SEPARATOR).count());
        u32::try_from(below).unwrap_or(u32::MAX)
    }

    /// Releases every open directory
    pub(crate) fn close(&mut self) {
        self.pending = None;
        while !self.frames.is_empty() {
            self.pop_frame();
        }
    }

    #[inline]
    pub(crate) const fn spec(&self) -> &SearchSpec {
        &self.spec
    }

    #[inline]
    pub(crate) fn warnings(&self) -> &[TraversalWarning] {
        &self.warnings
    }

    #[inline]
    pub(crate) const fn visited(&self) -> u64 {
        self.visited
    }

    #[inline]
    pub(crate) fn open_frames(&self) -> usize {
        self.frames.len()
    }
}
