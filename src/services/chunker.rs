//! Code-aware chunking that keeps logical blocks together.
//!
//! A file is cut into logical blocks at language-specific boundaries, blocks
//! are packed greedily into chunks, and every chunk is prefixed with the
//! file's header context (imports, package declarations) so it can be read
//! on its own. Blocks too large for a single chunk are cut with an
//! overlapping sliding window.

use std::ops::Range;

use super::language::LanguageProfile;
use crate::models::{Chunk, ChunkFragment, ChunkKind, IndexingConfig, SourceFile};

/// Bytes shared by consecutive windows of a large block.
pub const LARGE_BLOCK_OVERLAP: usize = 100;

/// Smallest body a large-block window may carry, whatever the budget.
pub const MIN_WINDOW: usize = 64;

const CONTEXT_MARKER: &str = "...[Context]...";
const LARGE_BLOCK_MARKER: &str = "...[Large Block Split]...";

/// Splits source text into size-bounded chunks along logical boundaries.
#[derive(Debug, Clone, Copy)]
pub struct CodeChunker {
    /// Maximum chunk length in bytes, header context and marker included.
    max_chunk_size: usize,
}

impl CodeChunker {
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    pub fn from_config(config: &IndexingConfig) -> Self {
        Self::new(config.chunk_size as usize)
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Chunk a file, assigning dense chunk ids in document order.
    pub fn chunk_file(&self, file: &SourceFile) -> Vec<Chunk> {
        self.chunk(&file.content, file.extension())
            .into_iter()
            .enumerate()
            .map(|(idx, fragment)| Chunk::from_fragment(&file.path, idx as u32, fragment))
            .collect()
    }

    /// Chunk `text` using the rules for `extension`.
    pub fn chunk(&self, text: &str, extension: &str) -> Vec<ChunkFragment> {
        if text.is_empty() {
            return Vec::new();
        }

        let profile = LanguageProfile::from_extension(extension);
        let header = profile.extract_header(text);
        let layout = Layout::new(text, &header);
        let budget = self.max_chunk_size;

        let mut fragments = Vec::new();
        let mut buffer: Option<Range<usize>> = None;

        for block in split_blocks(text, &profile.block_starts(text)) {
            let buffered = buffer.as_ref().map_or(0, |b| b.len());
            if buffered + block.len() + layout.logical_prefix.len() <= budget {
                buffer = Some(match buffer {
                    Some(b) => b.start..block.end,
                    None => block,
                });
                continue;
            }

            if let Some(b) = buffer.take() {
                fragments.push(layout.fragment(b, ChunkKind::Logical));
            }

            if block.len() + layout.logical_prefix.len() > budget {
                self.split_large_block(&layout, block, &mut fragments);
            } else {
                buffer = Some(block);
            }
        }

        if let Some(b) = buffer {
            fragments.push(layout.fragment(b, ChunkKind::Logical));
        }

        fragments
    }

    /// Sliding-window split of a block that cannot fit in one chunk.
    fn split_large_block(
        &self,
        layout: &Layout<'_>,
        block: Range<usize>,
        out: &mut Vec<ChunkFragment>,
    ) {
        let text = layout.text;
        let window = self
            .max_chunk_size
            .saturating_sub(layout.split_prefix.len())
            .max(MIN_WINDOW);
        let overlap = LARGE_BLOCK_OVERLAP.min(window / 2);

        let mut start = block.start;
        loop {
            let mut end = floor_char_boundary(text, (start + window).min(block.end));
            if end <= start {
                end = ceil_char_boundary(text, start + 1);
            }

            out.push(layout.fragment(start..end, ChunkKind::LargeBlockSplit));

            if end >= block.end {
                break;
            }

            let next = floor_char_boundary(text, end.saturating_sub(overlap));
            start = if next > start { next } else { end };
        }
    }
}

/// Shared per-file state: prefixes and the newline index for line numbers.
struct Layout<'a> {
    text: &'a str,
    logical_prefix: String,
    split_prefix: String,
    newlines: Vec<usize>,
}

impl<'a> Layout<'a> {
    fn new(text: &'a str, header: &str) -> Self {
        let (logical_prefix, split_prefix) = if header.is_empty() {
            (String::new(), format!("{LARGE_BLOCK_MARKER}\n\n"))
        } else {
            (
                format!("{header}\n\n{CONTEXT_MARKER}\n\n"),
                format!("{header}\n\n{LARGE_BLOCK_MARKER}\n\n"),
            )
        };

        Self {
            text,
            logical_prefix,
            split_prefix,
            newlines: text.match_indices('\n').map(|(pos, _)| pos).collect(),
        }
    }

    /// 1-based line of the byte at `offset`.
    fn line_of(&self, offset: usize) -> u32 {
        (self.newlines.partition_point(|&pos| pos < offset) + 1) as u32
    }

    fn fragment(&self, range: Range<usize>, kind: ChunkKind) -> ChunkFragment {
        let body = &self.text[range.clone()];

        // A block usually opens with the newline that ended the previous line.
        let first = body
            .find(|c| c != '\n')
            .map_or(range.start, |idx| range.start + idx);
        let start_line = self.line_of(first);
        let end_line = self.line_of(range.end - 1).max(start_line);

        let prefix = match kind {
            ChunkKind::Logical => &self.logical_prefix,
            ChunkKind::LargeBlockSplit => &self.split_prefix,
        };

        ChunkFragment {
            text: format!("{prefix}{body}"),
            start_line,
            end_line,
            start_offset: range.start,
            end_offset: range.end,
            kind,
        }
    }
}

/// Contiguous, non-empty block ranges covering the whole text.
fn split_blocks(text: &str, starts: &[usize]) -> Vec<Range<usize>> {
    let mut blocks = Vec::with_capacity(starts.len() + 1);
    let mut prev = 0;
    for &start in starts.iter().chain(std::iter::once(&text.len())) {
        if start > prev {
            blocks.push(prev..start);
            prev = start;
        }
    }
    blocks
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rebuild the original text from fragment bodies, dropping window overlap.
    fn reconstruct(fragments: &[ChunkFragment]) -> String {
        let mut out = String::new();
        let mut cursor = 0;
        for fragment in fragments {
            assert!(
                fragment.start_offset <= cursor,
                "gap before fragment at {}",
                fragment.start_offset
            );
            if fragment.end_offset > cursor {
                let skip = cursor - fragment.start_offset;
                out.push_str(&fragment.body()[skip..]);
                cursor = fragment.end_offset;
            }
        }
        out
    }

    fn assert_line_ranges(fragments: &[ChunkFragment]) {
        let mut last_start = 1;
        for fragment in fragments {
            assert!(fragment.start_line >= 1);
            assert!(fragment.start_line <= fragment.end_line);
            assert!(fragment.start_line >= last_start);
            last_start = fragment.start_line;
        }
    }

    fn two_function_python() -> String {
        let mut text = String::from("import os\nfrom typing import List\n\n");
        for name in ["alpha", "beta"] {
            text.push_str(&format!("def {name}():\n"));
            for i in 1..=17 {
                text.push_str(&format!("    value_{i:02} = helper(value_{i:02}, {i:02})\n"));
            }
            if name == "alpha" {
                text.push('\n');
            }
        }
        text
    }

    #[test]
    fn test_empty_input() {
        assert!(CodeChunker::new(1000).chunk("", "py").is_empty());
    }

    #[test]
    fn test_two_functions_two_chunks() {
        let text = two_function_python();
        assert_eq!(text.lines().count(), 40);

        let fragments = CodeChunker::new(1000).chunk(&text, "py");
        assert_eq!(fragments.len(), 2);

        let header = "import os\nfrom typing import List\n\n...[Context]...\n\n";
        for fragment in &fragments {
            assert!(fragment.text.starts_with(header));
            assert!(fragment.text.len() <= 1000);
            assert_eq!(fragment.kind, ChunkKind::Logical);
        }

        assert_eq!((fragments[0].start_line, fragments[0].end_line), (1, 21));
        assert_eq!((fragments[1].start_line, fragments[1].end_line), (23, 40));
        assert!(fragments[1].body().contains("def beta():"));
        assert_eq!(reconstruct(&fragments), text);
    }

    #[test]
    fn test_chunk_file_assigns_dense_ids() {
        let file = SourceFile::new("pkg/mod.py", two_function_python());
        let chunks = CodeChunker::new(1000).chunk_file(&file);
        let ids: Vec<u32> = chunks.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(chunks[1].record_id(), "pkg/mod.py_1");
    }

    #[test]
    fn test_large_block_is_windowed() {
        let mut text = String::from("import numpy as np\nfrom collections import OrderedDict\n\ndef big():\n");
        while text.len() < 5100 {
            text.push_str("    total += 1\n");
        }

        let fragments = CodeChunker::new(1000).chunk(&text, ".py");
        let splits: Vec<&ChunkFragment> = fragments
            .iter()
            .filter(|f| f.kind == ChunkKind::LargeBlockSplit)
            .collect();

        assert!(splits.len() >= 5);
        for fragment in &fragments {
            assert!(fragment.text.len() <= 1000, "{} bytes", fragment.text.len());
        }
        for split in &splits {
            assert!(split.text.starts_with(
                "import numpy as np\nfrom collections import OrderedDict\n\n...[Large Block Split]...\n\n"
            ));
        }

        assert_eq!(splits[0].start_line, 4);
        assert_eq!(
            splits.last().map(|f| f.end_line),
            Some(text.lines().count() as u32)
        );
        assert_line_ranges(&fragments);
        assert_eq!(reconstruct(&fragments), text);
    }

    #[test]
    fn test_window_line_numbers_are_exact() {
        let text: String = (1..=200).map(|i| format!("line {i:03}\n")).collect();
        let fragments = CodeChunker::new(200).chunk(&text, "txt");
        assert!(fragments.len() > 1);

        // Each line carries its own number; read it back from the line holding `offset`.
        let numbered_line = |offset: usize| -> u32 {
            let line_start = text[..offset].rfind('\n').map_or(0, |p| p + 1);
            text[line_start + 5..line_start + 8].parse().unwrap()
        };

        for fragment in &fragments {
            let body = fragment.body();
            let first = fragment.start_offset + body.len() - body.trim_start_matches('\n').len();
            assert_eq!(fragment.start_line, numbered_line(first));
            assert_eq!(fragment.end_line, numbered_line(fragment.end_offset - 1));
        }
        assert_eq!(reconstruct(&fragments), text);
    }

    #[test]
    fn test_budget_smaller_than_header() {
        let text = "import os\nimport sys\n\ndef a():\n    return os.getcwd()\n\ndef b():\n    return sys.argv\n";
        let fragments = CodeChunker::new(10).chunk(text, "py");

        assert!(!fragments.is_empty());
        assert!(fragments
            .iter()
            .all(|f| f.kind == ChunkKind::LargeBlockSplit));
        assert_eq!(reconstruct(&fragments), text);
    }

    #[test]
    fn test_unknown_extension_splits_on_blank_lines() {
        let text = "para one\n\npara two\n\npara three";
        let fragments = CodeChunker::new(20).chunk(text, "xyz");

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "para one\n\npara two");
        assert_eq!((fragments[0].start_line, fragments[0].end_line), (1, 3));
        assert_eq!(fragments[1].text, "\n\npara three");
        assert_eq!((fragments[1].start_line, fragments[1].end_line), (5, 5));
    }

    #[test]
    fn test_no_boundaries_single_chunk() {
        let text = "just some text\nwithout blank lines\n";
        let fragments = CodeChunker::new(1000).chunk(text, "md");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, text);
        assert_eq!((fragments[0].start_line, fragments[0].end_line), (1, 2));
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let text = "héllo wörld ✓ 日本語 ".repeat(40);
        let fragments = CodeChunker::new(100).chunk(&text, "txt");

        assert!(fragments.len() > 1);
        for fragment in &fragments {
            assert!(fragment.text.len() <= 100);
        }
        assert_eq!(reconstruct(&fragments), text);
    }

    #[test]
    fn test_logical_chunks_respect_budget() {
        let mut text = String::from("package main\n\nimport \"fmt\"\n");
        for i in 0..30 {
            text.push_str(&format!(
                "\nfunc handler{i}() {{\n    fmt.Println(\"handler {i}\")\n}}\n"
            ));
        }

        let fragments = CodeChunker::new(300).chunk(&text, "go");
        assert!(fragments.len() > 1);
        for fragment in &fragments {
            assert!(fragment.text.len() <= 300);
            assert!(fragment.text.starts_with("package main\nimport \"fmt\""));
        }
        assert_line_ranges(&fragments);
        assert_eq!(reconstruct(&fragments), text);
    }
}
