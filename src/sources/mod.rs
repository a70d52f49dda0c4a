//! Repository sources.

mod local;

pub use local::{LocalSource, SKIPPED_DIRS};
