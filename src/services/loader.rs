//! Turns files on disk into a single normalized text string.
//!
//! Anything that cannot be read or decoded becomes empty content; callers
//! drop empty files before chunking.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::utils::file::{extension_of, read_text_file};

/// Load `path` as text, dispatching on its extension.
pub fn load_content(path: &Path, max_file_size: u64) -> String {
    let loaded = match extension_of(path).as_deref() {
        Some("ipynb") => load_notebook(path, max_file_size),
        Some("pdf") => load_pdf(path, max_file_size),
        _ => read_text_file(path, max_file_size).map_err(|e| e.to_string()),
    };

    match loaded {
        Ok(content) => content,
        Err(reason) => {
            debug!(path = %path.display(), %reason, "treating file as empty");
            String::new()
        }
    }
}

#[derive(Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<NotebookCell>,
}

#[derive(Deserialize)]
struct NotebookCell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// nbformat stores cell sources either as one string or as a list of lines.
#[derive(Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            CellSource::Text(text) => text,
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

/// Code and markdown cells in order, separated by blank lines.
fn flatten_notebook(raw: &str) -> Result<String, String> {
    let notebook: Notebook = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    Ok(notebook
        .cells
        .into_iter()
        .filter(|cell| matches!(cell.cell_type.as_str(), "code" | "markdown"))
        .map(|cell| cell.source.into_text())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n"))
}

fn load_notebook(path: &Path, max_file_size: u64) -> Result<String, String> {
    let raw = read_text_file(path, max_file_size).map_err(|e| e.to_string())?;
    flatten_notebook(&raw)
}

#[cfg(feature = "pdf")]
fn load_pdf(path: &Path, max_file_size: u64) -> Result<String, String> {
    let size = std::fs::metadata(path).map_err(|e| e.to_string())?.len();
    if size > max_file_size {
        return Err(format!("file exceeds maximum size: {size} > {max_file_size}"));
    }
    pdf_extract::extract_text(path).map_err(|e| e.to_string())
}

#[cfg(not(feature = "pdf"))]
fn load_pdf(_path: &Path, _max_file_size: u64) -> Result<String, String> {
    Err("built without the `pdf` feature".to_string())
}
