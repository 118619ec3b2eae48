use crate::{
    Entry, Result,
    fs::{FileSystem, NativeFs},
    walk::{SearchSpec, TraversalWarning, engine::Traversal},
};
use core::{
    fmt,
    iter::FusedIterator,
    sync::atomic::{AtomicBool, Ordering},
};
use std::sync::Arc;

/**
 A cloneable flag that cancels a [`SearchHandle`] from anywhere, including another thread.

 Cancellation is cooperative: the search notices it at its next pull, then ends and
 releases its open directories.
*/
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/**
 A running search: a lazy, cancellable cursor over matching entries.

 Each pull does only the filesystem work needed to produce one entry or to find
 that there are none left. Entries inside one directory come in the order the
 operating system lists them, which is not sorted.

 Directories that cannot be read part way through are skipped and recorded in
 [`SearchHandle::warnings`]; only failures on the root stop a search, and those are
 reported by [`SearchHandle::start`].

 Dropping the handle, exhausting it, or calling [`SearchHandle::close`] releases every
 open directory handle.

 ```no_run
 use recls::{SearchBuilder, SearchHandle};
 let spec = SearchBuilder::new("/etc").pattern("*.conf").build().unwrap();
 for entry in SearchHandle::start(spec).unwrap() {
     println!("{entry}");
 }
 ```
*/
pub struct SearchHandle<F: FileSystem = NativeFs> {
    traversal: Traversal<F>,
    cancel: CancelToken,
    closed: bool,
}

impl SearchHandle<NativeFs> {
    /**
     Starts a search on the host filesystem.

     # Errors
     [`SearchError::NotFound`](crate::SearchError::NotFound),
     [`SearchError::Access`](crate::SearchError::Access) or
     [`SearchError::NotADirectory`](crate::SearchError::NotADirectory) when the root
     cannot be opened.
    */
    pub fn start(spec: SearchSpec) -> Result<Self> {
        Self::with_filesystem(NativeFs, spec)
    }
}

impl<F: FileSystem> SearchHandle<F> {
    /// Starts a search over any [`FileSystem`]
    ///
    /// # Errors
    /// As [`SearchHandle::start`].
    pub fn with_filesystem(fs: F, spec: SearchSpec) -> Result<Self> {
        Ok(Self {
            traversal: Traversal::start(fs, spec)?,
            cancel: CancelToken::new(),
            closed: false,
        })
    }

    /// The next matching entry, or `None` once the search has ended
    pub fn next_entry(&mut self) -> Option<Entry> {
        if self.closed {
            return None;
        }
        if self.cancel.is_cancelled() {
            log::debug!("search of {} cancelled", self.traversal.spec().root());
            self.close();
            return None;
        }

        let next = self.traversal.next_entry();
        if next.is_none() {
            self.close();
        }
        next
    }

    /// Asks the search to stop, the next pull returns `None`
    #[inline]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this search, for use from elsewhere
    #[must_use]
    #[inline]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Ends the search and releases its directory handles. Safe to call any number of times
    pub fn close(&mut self) {
        if !self.closed {
            self.traversal.close();
            self.closed = true;
            log::debug!(
                "search of {} closed after {} children",
                self.traversal.spec().root(),
                self.traversal.visited()
            );
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Directories and entries skipped so far, with the reason for each
    #[must_use]
    #[inline]
    pub fn warnings(&self) -> &[TraversalWarning] {
        self.traversal.warnings()
    }

    /// Number of directory children inspected so far, matching or not
    #[must_use]
    #[inline]
    pub const fn visited(&self) -> u64 {
        self.traversal.visited()
    }

    /// Directories currently open on the frontier
    #[must_use]
    #[inline]
    pub fn open_frames(&self) -> usize {
        self.traversal.open_frames()
    }

    #[must_use]
    #[inline]
    pub const fn spec(&self) -> &SearchSpec {
        self.traversal.spec()
    }
}

impl<F: FileSystem> Iterator for SearchHandle<F> {
    type Item = Entry;

    #[inline]
    fn next(&mut self) -> Option<Entry> {
        self.next_entry()
    }
}

impl<F: FileSystem> FusedIterator for SearchHandle<F> {}

impl<F: FileSystem> Drop for SearchHandle<F> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<F: FileSystem> fmt::Debug for SearchHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchHandle")
            .field("spec", self.traversal.spec())
            .field("closed", &self.closed)
            .field("visited", &self.traversal.visited())
            .field("open_frames", &self.traversal.open_frames())
            .finish_non_exhaustive()
    }
}
