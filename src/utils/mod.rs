//! Utility modules.

pub mod file;
pub mod retry;

pub use file::{extension_of, read_text_file, relative_path};
pub use retry::{RetryConfig, RetryResult, Retryable, with_retry};
