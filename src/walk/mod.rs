mod config;
mod engine;
mod handle;
mod warning;

pub use config::{SearchBuilder, SearchOptions, SearchSpec};
pub use handle::{CancelToken, SearchHandle};
pub use warning::TraversalWarning;
