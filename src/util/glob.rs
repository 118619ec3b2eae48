//! Shell glob matching for single path components.
//!
//! Supported syntax:
//! - any character except `?`, `*`, `[`, `\` or `{` matches itself
//! - `?` matches exactly one character
//! - `*` matches any run of characters, including none
//! - `[...]` is a character class with ranges (`[a-z]`), negation when the first
//!   character is `!` or `^`, and a literal `]` when it comes first (`[]x]`)
//! - `{a,b,c}` matches any of the alternatives, which may themselves be globs
//! - a backslash makes the next character literal
//! - `|` separates independent globs, a name matching any of them matches the list
//!
//! Matching is anchored: the whole name must match, never a substring.
//! `*` on its own, or `*.*` anywhere in a list, matches every name.
//!
//! ```
//! use recls::Matcher;
//!
//! let matcher = Matcher::compile("*.rs|Cargo.{toml,lock}", true).unwrap();
//! assert!(matcher.matches(b"lib.rs"));
//! assert!(matcher.matches(b"Cargo.lock"));
//! assert!(!matcher.matches(b"lib.rs.bak"));
//! ```

use crate::{Result, SearchError};
use core::mem;
use regex::bytes::{Regex, RegexBuilder};
use thiserror::Error;

/// Separates globs in a pattern list
pub const PATTERN_SEPARATOR: char = '|';

/// The glob that matches every name
pub const WILDCARDS_ALL: &str = "*";

/// Reasons a glob fails to translate
#[derive(Error, Debug, PartialEq, Eq)]
enum GlobError {
    #[error("bare escape at the end of the pattern")]
    BareEscape,
    #[error("unclosed character class")]
    UnclosedClass,
    #[error("reversed range {0}-{1}")]
    ReversedRange(char, char),
    #[error("unclosed alternation")]
    UnclosedAlternation,
    #[error("empty pattern")]
    Empty,
}

/// Something that may appear in a character class.
#[derive(Debug)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

/// A character class being read.
#[derive(Debug, Default)]
struct ClassAccumulator {
    negated: bool,
    items: Vec<ClassItem>,
}

/// The current state of the translator.
#[derive(Debug, Default)]
enum State {
    /// The next character is outside of any construct.
    #[default]
    Literal,
    /// The previous character was a backslash.
    Escape,
    /// Just read `[`, the next character may negate the class or be a literal `]`.
    ClassStart,
    /// Inside a class, reading characters or range starts.
    Class(ClassAccumulator),
    /// Inside a class after `x-`, waiting for the end of the range.
    ClassRange(ClassAccumulator, char),
    /// Inside a class after a backslash.
    ClassEscape(ClassAccumulator),
    /// Inside `{...}`: the alternatives so far, the current one and the nesting depth.
    Alternate(Vec<String>, String, usize),
}

/// Escapes a character that will sit inside a regex class
fn escape_in_class(chr: char, out: &mut String) {
    if matches!(chr, '\\' | ']' | '[' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(chr);
}

/// Renders a finished class as a regex class
fn close_class(acc: ClassAccumulator) -> String {
    let mut out = String::from("[");
    if acc.negated {
        out.push('^');
    }
    for item in acc.items {
        match item {
            ClassItem::Char(chr) => escape_in_class(chr, &mut out),
            ClassItem::Range(start, end) => {
                escape_in_class(start, &mut out);
                out.push('-');
                escape_in_class(end, &mut out);
            }
        }
    }
    out.push(']');
    out
}

/// Translates one glob into an unanchored regex fragment.
struct Translator<I: Iterator<Item = char>> {
    chars: I,
    state: State,
    out: String,
}

impl<I> Translator<I>
where
    I: Iterator<Item = char>,
{
    fn literal(&mut self, chr: char) {
        let mut buf = [0_u8; 4];
        self.out.push_str(&regex::escape(chr.encode_utf8(&mut buf)));
    }

    /// Feeds one character, or the end of input as `None`
    fn step(&mut self, next: Option<char>) -> core::result::Result<(), GlobError> {
        self.state = match (mem::take(&mut self.state), next) {
            (State::Literal, None) => State::Literal,
            (State::Literal, Some(chr)) => match chr {
                '\\' => State::Escape,
                '[' => State::ClassStart,
                '{' => State::Alternate(Vec::new(), String::new(), 0),
                '?' => {
                    self.out.push_str("(?s:.)");
                    State::Literal
                }
                '*' => {
                    // `-u` lets the star run over bytes that are not UTF-8
                    self.out.push_str("(?s-u:.)*");
                    State::Literal
                }
                other => {
                    self.literal(other);
                    State::Literal
                }
            },

            (State::Escape, None) => return Err(GlobError::BareEscape),
            (State::Escape, Some(chr)) => {
                self.literal(chr);
                State::Literal
            }

            (State::ClassStart, None) => return Err(GlobError::UnclosedClass),
            (State::ClassStart, Some(chr)) => match chr {
                '!' | '^' => State::Class(ClassAccumulator {
                    negated: true,
                    items: Vec::new(),
                }),
                '\\' => State::ClassEscape(ClassAccumulator::default()),
                other => State::Class(ClassAccumulator {
                    negated: false,
                    items: vec![ClassItem::Char(other)],
                }),
            },

            (
                State::Class(_) | State::ClassRange(..) | State::ClassEscape(_),
                None,
            ) => return Err(GlobError::UnclosedClass),
            (State::Class(mut acc), Some(chr)) => match chr {
                // `]` straight after a negation is a literal
                ']' if acc.items.is_empty() => {
                    acc.items.push(ClassItem::Char(']'));
                    State::Class(acc)
                }
                ']' => {
                    self.out.push_str(&close_class(acc));
                    State::Literal
                }
                '\\' => State::ClassEscape(acc),
                '-' => match acc.items.pop() {
                    Some(ClassItem::Char(start)) => State::ClassRange(acc, start),
                    other => {
                        acc.items.extend(other);
                        acc.items.push(ClassItem::Char('-'));
                        State::Class(acc)
                    }
                },
                other => {
                    acc.items.push(ClassItem::Char(other));
                    State::Class(acc)
                }
            },
            (State::ClassEscape(mut acc), Some(chr)) => {
                acc.items.push(ClassItem::Char(chr));
                State::Class(acc)
            }
            (State::ClassRange(mut acc, start), Some(chr)) => match chr {
                // `x-]` is the two literals
                ']' => {
                    acc.items.push(ClassItem::Char(start));
                    acc.items.push(ClassItem::Char('-'));
                    self.out.push_str(&close_class(acc));
                    State::Literal
                }
                end => {
                    let end = if end == '\\' {
                        self.chars.next().ok_or(GlobError::UnclosedClass)?
                    } else {
                        end
                    };
                    if start > end {
                        return Err(GlobError::ReversedRange(start, end));
                    }
                    acc.items.push(ClassItem::Range(start, end));
                    State::Class(acc)
                }
            },

            (State::Alternate(..), None) => return Err(GlobError::UnclosedAlternation),
            (State::Alternate(mut gathered, mut current, depth), Some(chr)) => match chr {
                ',' if depth == 0 => {
                    gathered.push(mem::take(&mut current));
                    State::Alternate(gathered, current, depth)
                }
                '}' if depth == 0 => {
                    gathered.push(current);
                    self.out.push_str(&close_alternate(gathered)?);
                    State::Literal
                }
                '\\' => {
                    // keep the escape for the recursive translation
                    current.push('\\');
                    current.push(self.chars.next().ok_or(GlobError::UnclosedAlternation)?);
                    State::Alternate(gathered, current, depth)
                }
                '{' => {
                    current.push('{');
                    State::Alternate(gathered, current, depth + 1)
                }
                '}' => {
                    current.push('}');
                    State::Alternate(gathered, current, depth - 1)
                }
                other => {
                    current.push(other);
                    State::Alternate(gathered, current, depth)
                }
            },
        };
        Ok(())
    }

    fn run(mut self) -> core::result::Result<String, GlobError> {
        while let Some(chr) = self.chars.next() {
            self.step(Some(chr))?;
        }
        self.step(None)?;
        Ok(self.out)
    }
}

/// Renders `{a,b}` alternatives, each translated as a glob of its own
fn close_alternate(gathered: Vec<String>) -> core::result::Result<String, GlobError> {
    let mut branches = Vec::with_capacity(gathered.len());
    for alternative in gathered {
        branches.push(translate(&alternative)?);
    }
    Ok(format!("(?:{})", branches.join("|")))
}

/// Translates one glob (no `|` lists) into a regex fragment without anchors
fn translate(glob: &str) -> core::result::Result<String, GlobError> {
    Translator {
        chars: glob.chars(),
        state: State::Literal,
        out: String::with_capacity(glob.len() * 2),
    }
    .run()
}

/// Where the list splitter stands relative to a character class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassPosition {
    Outside,
    /// Just after `[`, where `!`, `^` and `]` are not special yet
    Opened,
    /// Just after `[!` or `[^`, where `]` is still a literal
    Negated,
    Inside,
}

/// Splits a pattern list on unescaped `|` outside of classes, dropping empty entries
fn split_pattern_list(pattern: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut class = ClassPosition::Outside;
    for (idx, chr) in pattern.char_indices() {
        if escaped {
            escaped = false;
            if class != ClassPosition::Outside {
                class = ClassPosition::Inside;
            }
            continue;
        }
        class = match (class, chr) {
            (_, '\\') => {
                escaped = true;
                class
            }
            (ClassPosition::Outside, '[') => ClassPosition::Opened,
            (ClassPosition::Outside, PATTERN_SEPARATOR) => {
                parts.push(&pattern[start..idx]);
                start = idx + chr.len_utf8();
                ClassPosition::Outside
            }
            (ClassPosition::Outside, _) => ClassPosition::Outside,
            (ClassPosition::Opened, '!' | '^') => ClassPosition::Negated,
            (ClassPosition::Opened | ClassPosition::Negated, _) => ClassPosition::Inside,
            (ClassPosition::Inside, ']') => ClassPosition::Outside,
            (ClassPosition::Inside, _) => ClassPosition::Inside,
        };
    }
    parts.push(&pattern[start..]);
    parts.retain(|part| !part.is_empty());
    parts
}

#[derive(Debug, Clone)]
enum Compiled {
    All,
    Regex(Regex),
}

/**
 A compiled glob (or `|` separated list of globs) tested against single names.

 Built once per search and shared by every directory in it.
*/
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: Box<str>,
    compiled: Compiled,
}

impl Matcher {
    /**
     Compiles `pattern` for whole-name matching.

     # Errors
     [`SearchError::PatternSyntax`] if the pattern is empty, has an unclosed class or
     alternation, a reversed range, or ends in a bare backslash.
    */
    pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let syntax_error = |reason: String| SearchError::PatternSyntax {
            pattern: pattern.to_owned(),
            reason,
        };

        let globs = split_pattern_list(pattern);
        if globs.is_empty() {
            return Err(syntax_error(GlobError::Empty.to_string()));
        }

        if globs.iter().any(|glob| matches!(*glob, WILDCARDS_ALL | "*.*")) {
            return Ok(Self {
                pattern: pattern.into(),
                compiled: Compiled::All,
            });
        }

        let mut fragments = Vec::with_capacity(globs.len());
        for glob in globs {
            fragments.push(translate(glob).map_err(|e| syntax_error(e.to_string()))?);
        }

        let re = RegexBuilder::new(&format!("^(?:{})$", fragments.join("|")))
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| syntax_error(e.to_string()))?;

        Ok(Self {
            pattern: pattern.into(),
            compiled: Compiled::Regex(re),
        })
    }

    /// Tests a single path component
    #[inline]
    #[must_use]
    pub fn matches(&self, name: &[u8]) -> bool {
        match &self.compiled {
            Compiled::All => true,
            Compiled::Regex(re) => re.is_match(name),
        }
    }

    /// The pattern this matcher was compiled from
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
