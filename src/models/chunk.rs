//! Chunk and index record models.

use serde::{Deserialize, Serialize};

/// A file handed to the chunker. Discarded once chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Extension without the dot, empty when there is none.
    pub fn extension(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext,
            _ => "",
        }
    }
}

/// How a chunk was cut out of its file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// One or more whole logical blocks.
    #[default]
    Logical,
    /// A sliding-window piece of a block too large for one chunk.
    LargeBlockSplit,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Logical => "logical",
            ChunkKind::LargeBlockSplit => "large_block_split",
        }
    }
}

impl std::str::FromStr for ChunkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logical" => Ok(ChunkKind::Logical),
            "large_block_split" => Ok(ChunkKind::LargeBlockSplit),
            other => Err(format!("unknown chunk kind: {other}")),
        }
    }
}

/// Chunker output for a single piece of a file, before it gets a path and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFragment {
    /// Header context, marker and body, as sent to the embedder.
    pub text: String,
    /// First line of the body in the original file (1-based).
    pub start_line: u32,
    /// Last line of the body in the original file (1-based, inclusive).
    pub end_line: u32,
    /// Byte range of the body in the original text.
    pub start_offset: usize,
    pub end_offset: usize,
    pub kind: ChunkKind,
}

impl ChunkFragment {
    /// The original-file text this fragment covers, without header or marker.
    pub fn body(&self) -> &str {
        let len = self.end_offset - self.start_offset;
        &self.text[self.text.len() - len..]
    }
}

/// A chunk of a file, addressed by path and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub path: String,
    /// Dense, 0-based position of the chunk within its file.
    pub chunk_id: u32,
    pub text: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default)]
    pub kind: ChunkKind,
}

impl Chunk {
    pub fn from_fragment(path: &str, chunk_id: u32, fragment: ChunkFragment) -> Self {
        Self {
            path: path.to_string(),
            chunk_id,
            text: fragment.text,
            start_line: fragment.start_line,
            end_line: fragment.end_line,
            kind: fragment.kind,
        }
    }

    /// Stable key of the chunk in the index.
    pub fn record_id(&self) -> String {
        record_id(&self.path, self.chunk_id)
    }

    /// `path:start-end` hint for display.
    pub fn location(&self) -> String {
        format!("{}:{}-{}", self.path, self.start_line, self.end_line)
    }
}

/// Record id for a chunk: `"{path}_{chunk_id}"`.
pub fn record_id(path: &str, chunk_id: u32) -> String {
    format!("{path}_{chunk_id}")
}

/// Metadata persisted next to every vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub path: String,
    pub chunk_id: u32,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default)]
    pub kind: ChunkKind,
}

/// A chunk with its embedding, as persisted by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: RecordMetadata,
}

impl IndexRecord {
    pub fn from_chunk(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.record_id(),
            vector,
            metadata: RecordMetadata {
                path: chunk.path,
                chunk_id: chunk.chunk_id,
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                kind: chunk.kind,
            },
            text: chunk.text,
        }
    }

    pub fn to_chunk(&self) -> Chunk {
        Chunk {
            path: self.metadata.path.clone(),
            chunk_id: self.metadata.chunk_id,
            text: self.text.clone(),
            start_line: self.metadata.start_line,
            end_line: self.metadata.end_line,
            kind: self.metadata.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, chunk_id: u32) -> Chunk {
        Chunk {
            path: path.to_string(),
            chunk_id,
            text: "fn main() {}".to_string(),
            start_line: 3,
            end_line: 7,
            kind: ChunkKind::Logical,
        }
    }

    #[test]
    fn test_record_id_format() {
        assert_eq!(chunk("src/main.rs", 4).record_id(), "src/main.rs_4");
        assert_eq!(record_id("a.py", 0), "a.py_0");
    }

    #[test]
    fn test_record_round_trips_chunk() {
        let original = chunk("lib/util.go", 2);
        let record = IndexRecord::from_chunk(original.clone(), vec![0.1, 0.2]);
        assert_eq!(record.id, "lib/util.go_2");
        assert_eq!(record.metadata.start_line, 3);
        assert_eq!(record.to_chunk(), original);
    }

    #[test]
    fn test_source_file_extension() {
        assert_eq!(SourceFile::new("src/app.py", "").extension(), "py");
        assert_eq!(SourceFile::new("archive.tar.gz", "").extension(), "gz");
        assert_eq!(SourceFile::new("Makefile", "").extension(), "");
        assert_eq!(SourceFile::new("config/.env", "").extension(), "");
    }

    #[test]
    fn test_chunk_kind_parse() {
        assert_eq!(
            "large_block_split".parse::<ChunkKind>().unwrap(),
            ChunkKind::LargeBlockSplit
        );
        assert!("other".parse::<ChunkKind>().is_err());
        assert_eq!(ChunkKind::Logical.as_str(), "logical");
    }

    #[test]
    fn test_location() {
        assert_eq!(chunk("a.rs", 0).location(), "a.rs:3-7");
    }
}
