use crate::{
    Result,
    filters::EntryTypes,
    util::{Matcher, NormalizedPath, PATTERN_SEPARATOR, WILDCARDS_ALL, normalize},
};
use core::num::NonZeroU32;
use std::ffi::{OsStr, OsString};

/**
 An immutable, validated description of one search.

 Produced by [`SearchBuilder::build`]; the root has been validated and every
 pattern compiled, so starting a search can only fail on the filesystem.
*/
#[derive(Debug, Clone)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "each flag is an independent search option"
)]
pub struct SearchSpec {
    pub(crate) given_root: OsString,
    pub(crate) root: NormalizedPath,
    pub(crate) matcher: Matcher,
    pub(crate) exclude: Option<Matcher>,
    pub(crate) recursive: bool,
    pub(crate) case_sensitive: bool,
    pub(crate) entry_types: EntryTypes,
    pub(crate) max_depth: Option<NonZeroU32>,
    pub(crate) follow_symlinks: bool,
    pub(crate) show_hidden: bool,
}

impl SearchSpec {
    /**
     The directory searched.

     Built lexically from the given root. A root that steps out through `..` is
     resolved on disk when the search starts, and the spec of a running
     [`SearchHandle`](crate::SearchHandle) holds the result.
    */
    #[must_use]
    #[inline]
    pub const fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// The root exactly as it was handed to the builder
    #[must_use]
    #[inline]
    pub fn given_root(&self) -> &OsStr {
        &self.given_root
    }

    #[must_use]
    #[inline]
    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    #[must_use]
    #[inline]
    pub const fn recursive(&self) -> bool {
        self.recursive
    }

    #[must_use]
    #[inline]
    pub const fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    #[must_use]
    #[inline]
    pub const fn entry_types(&self) -> EntryTypes {
        self.entry_types
    }

    #[must_use]
    #[inline]
    pub const fn max_depth(&self) -> Option<NonZeroU32> {
        self.max_depth
    }

    #[must_use]
    #[inline]
    pub const fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    #[must_use]
    #[inline]
    pub const fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    #[inline]
    pub(crate) fn is_excluded(&self, name: &[u8]) -> bool {
        self.exclude.as_ref().is_some_and(|ex| ex.matches(name))
    }

    /// Whether a name is filtered out by the hidden file policy
    #[inline]
    pub(crate) fn hides(&self, name: &[u8]) -> bool {
        !self.show_hidden && name.first() == Some(&b'.')
    }
}

/**
 Options for [`search_start`](crate::search_start), the flat way to describe a search.

 ```
 use recls::{EntryTypes, SearchOptions};
 let options = SearchOptions {
     entry_types: EntryTypes::BOTH,
     max_depth: Some(2),
     ..SearchOptions::default()
 };
 assert!(options.recursive);
 ```
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub recursive: bool,
    pub case_sensitive: bool,
    pub entry_types: EntryTypes,
    /// `None` or `Some(0)` for no limit
    pub max_depth: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            case_sensitive: true,
            entry_types: EntryTypes::FILES,
            max_depth: None,
        }
    }
}

/**
 A builder for a [`SearchSpec`].

 Every option has a default: match everything, recurse without a depth limit,
 case sensitive, regular files only, hidden entries shown, symlinks not followed.

 ```
 use recls::{EntryTypes, SearchBuilder};
 let spec = SearchBuilder::new("/tmp")
     .pattern("*.rs|*.toml")
     .entry_types(EntryTypes::BOTH)
     .max_depth(Some(3))
     .build()
     .unwrap();
 assert_eq!(spec.pattern(), "*.rs|*.toml");
 assert_eq!(spec.max_depth().map(|d| d.get()), Some(3));
 ```
*/
#[derive(Debug, Clone)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "mirrors the flags of SearchSpec"
)]
pub struct SearchBuilder {
    root: OsString,
    pattern: String,
    exclude: Vec<String>,
    recursive: bool,
    case_sensitive: bool,
    entry_types: EntryTypes,
    max_depth: Option<NonZeroU32>,
    follow_symlinks: bool,
    show_hidden: bool,
}

impl SearchBuilder {
    /// Starts a search description rooted at `root`
    pub fn new<A: AsRef<OsStr>>(root: A) -> Self {
        Self {
            root: root.as_ref().to_owned(),
            pattern: WILDCARDS_ALL.into(),
            exclude: Vec::new(),
            recursive: true,
            case_sensitive: true,
            entry_types: EntryTypes::FILES,
            max_depth: None,
            follow_symlinks: false,
            show_hidden: true,
        }
    }

    /// Builds from the flat option set used by [`search_start`](crate::search_start)
    pub fn from_options<A: AsRef<OsStr>>(root: A, pattern: &str, options: SearchOptions) -> Self {
        Self::new(root)
            .pattern(pattern)
            .recursive(options.recursive)
            .case_sensitive(options.case_sensitive)
            .entry_types(options.entry_types)
            .max_depth(options.max_depth)
    }

    /// Set the glob, or `|` separated globs, names are matched against
    #[must_use]
    pub fn pattern<P: AsRef<str>>(mut self, pattern: P) -> Self {
        pattern.as_ref().clone_into(&mut self.pattern);
        self
    }

    /// Add a glob whose matches are neither yielded nor descended into
    #[must_use]
    pub fn exclude<P: AsRef<str>>(mut self, pattern: P) -> Self {
        self.exclude.push(pattern.as_ref().into());
        self
    }

    /// Set whether to descend into subdirectories, defaults to true
    #[must_use]
    pub const fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set case sensitive matching, defaults to true
    #[must_use]
    pub const fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set which kinds of entries are yielded, defaults to files
    #[must_use]
    pub const fn entry_types(mut self, entry_types: EntryTypes) -> Self {
        self.entry_types = entry_types;
        self
    }

    /// Set maximum search depth, children of the root are depth 1. `Some(0)` means unlimited
    #[must_use]
    pub const fn max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = match max_depth {
            None => None,
            Some(num) => NonZeroU32::new(num),
        };
        self
    }

    /// Sets whether to descend through symlinks to directories (default: false).
    ///
    /// Each directory is entered at most once, so loops end with a warning
    #[must_use]
    pub const fn follow_symlinks(mut self, follow_symlinks: bool) -> Self {
        self.follow_symlinks = follow_symlinks;
        self
    }

    /// Set whether names starting with a dot are yielded and descended, defaults to true
    #[must_use]
    pub const fn show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }

    /**
     Validates the configuration.

     # Errors
     [`SearchError::InvalidPath`](crate::SearchError::InvalidPath) for an empty root
     or one with a NUL byte,
     [`SearchError::PatternSyntax`](crate::SearchError::PatternSyntax) for a
     malformed include or exclude pattern.
    */
    pub fn build(self) -> Result<SearchSpec> {
        let root = normalize(&self.root)?;

        let matcher = Matcher::compile(&self.pattern, self.case_sensitive)?;
        let exclude = if self.exclude.is_empty() {
            None
        } else {
            let joined = self.exclude.join(&PATTERN_SEPARATOR.to_string());
            Some(Matcher::compile(&joined, self.case_sensitive)?)
        };

        Ok(SearchSpec {
            given_root: self.root,
            root,
            matcher,
            exclude,
            recursive: self.recursive,
            case_sensitive: self.case_sensitive,
            entry_types: self.entry_types,
            max_depth: self.max_depth,
            follow_symlinks: self.follow_symlinks,
            show_hidden: self.show_hidden,
        })
    }
}
