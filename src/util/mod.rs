mod glob;
mod path;
mod printer;

pub use glob::{Matcher, PATTERN_SEPARATOR, WILDCARDS_ALL};
pub use path::{NormalizedPath, PATH_SEPARATOR, count_separators, join, normalize};
pub(crate) use path::{given_cstring, split_after_last_parent, validate};
pub use printer::Printer;
