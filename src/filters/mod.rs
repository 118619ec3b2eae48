mod entry_types;

pub use entry_types::{EntryTypes, EntryTypesParser};
