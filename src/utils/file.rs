//! File utilities for repository scanning.

use std::fs;
use std::io::{Error, ErrorKind};
use std::path::Path;

/// Bytes inspected when sniffing for binary content.
const SNIFF_LEN: usize = 512;

/// Lowercased extension of `path` without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Read a UTF-8 text file, rejecting files over `max_size` and binary content.
pub fn read_text_file(path: &Path, max_size: u64) -> std::io::Result<String> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    let bytes = fs::read(path)?;
    if bytes[..bytes.len().min(SNIFF_LEN)].contains(&0) {
        return Err(Error::new(ErrorKind::InvalidData, "binary content"));
    }

    String::from_utf8(bytes).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

/// Path of `path` relative to `base`, `/`-separated on every platform.
pub fn relative_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
