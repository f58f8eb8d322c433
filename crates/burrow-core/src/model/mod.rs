/// Data model for observed filesystem nodes.
///
/// Re-exports the [`PathEntry`] snapshot and the size helpers used when
/// presenting sizes to humans.
pub mod entry;
pub mod size;

pub use entry::{wire_path, EntryKind, PathEntry};
pub use size::{format_size, parse_size};
