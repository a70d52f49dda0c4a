//! Per-language boundary and import rules used by the chunker.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Lines scanned from the top of a file when collecting the header context.
pub const HEADER_SCAN_LINES: usize = 50;

/// Language rules resolved from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageProfile {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Go,
    Rust,
    /// Blank-line splitting, no header.
    Default,
}

struct CompiledRules {
    /// Anchored at a newline: `\A\n(?:alt|alt...)`.
    boundary: Regex,
    import: Option<Regex>,
}

static RULES: LazyLock<HashMap<LanguageProfile, CompiledRules>> = LazyLock::new(|| {
    LanguageProfile::ALL
        .iter()
        .map(|profile| {
            let alternatives = profile.boundary_patterns().join("|");
            let rules = CompiledRules {
                boundary: Regex::new(&format!(r"\A\n(?:{alternatives})")).unwrap(),
                import: profile.import_pattern().map(|p| Regex::new(p).unwrap()),
            };
            (*profile, rules)
        })
        .collect()
});

impl LanguageProfile {
    pub const ALL: [LanguageProfile; 7] = [
        LanguageProfile::Python,
        LanguageProfile::JavaScript,
        LanguageProfile::TypeScript,
        LanguageProfile::Java,
        LanguageProfile::Go,
        LanguageProfile::Rust,
        LanguageProfile::Default,
    ];

    /// Resolve a profile from an extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "py" | "pyi" => LanguageProfile::Python,
            "js" | "jsx" | "mjs" | "cjs" => LanguageProfile::JavaScript,
            "ts" | "tsx" => LanguageProfile::TypeScript,
            "java" => LanguageProfile::Java,
            "go" => LanguageProfile::Go,
            "rs" => LanguageProfile::Rust,
            _ => LanguageProfile::Default,
        }
    }

    /// Patterns a line must start with to open a new block, in priority order.
    ///
    /// Each pattern is matched right after a newline; the newline itself
    /// stays with the block that follows.
    pub fn boundary_patterns(&self) -> &'static [&'static str] {
        match self {
            LanguageProfile::Python => &[r"class\s", r"def\s", r"@\w+"],
            LanguageProfile::JavaScript => &[
                r"class\s",
                r"function\s",
                r"const\s.*=\s.*=>",
                r"export\s",
            ],
            LanguageProfile::TypeScript => &[
                r"class\s",
                r"interface\s",
                r"function\s",
                r"const\s.*=\s.*=>",
                r"export\s",
            ],
            LanguageProfile::Java => &[
                r"public\sclass\s",
                r"class\s",
                r"public\svoid\s",
                r"private\svoid\s",
                r"protected\svoid\s",
            ],
            LanguageProfile::Go => &[r"func\s", r"type\s"],
            LanguageProfile::Rust => &[
                r"(?:pub(?:\([^)\n]*\))?\s+)?(?:async\s+)?fn\s",
                r"(?:pub(?:\([^)\n]*\))?\s+)?(?:struct|enum|trait|mod)\s",
                r"impl[\s<]",
                r"#\[",
            ],
            LanguageProfile::Default => &[r"\n"],
        }
    }

    /// Pattern for header lines (imports, package declarations), matched
    /// against trimmed lines.
    pub fn import_pattern(&self) -> Option<&'static str> {
        match self {
            LanguageProfile::Python => Some(r"^(import\s|from\s)"),
            LanguageProfile::JavaScript | LanguageProfile::TypeScript => {
                Some(r"^(import\s|require\()")
            }
            LanguageProfile::Java | LanguageProfile::Go => Some(r"^(import\s|package\s)"),
            LanguageProfile::Rust => Some(r"^(use\s|extern\s+crate\s)"),
            LanguageProfile::Default => None,
        }
    }

    fn rules(&self) -> &'static CompiledRules {
        &RULES[self]
    }

    /// Header context: matching lines among the first [`HEADER_SCAN_LINES`],
    /// in original order, joined with `\n`.
    pub fn extract_header(&self, text: &str) -> String {
        let Some(import) = &self.rules().import else {
            return String::new();
        };

        text.split('\n')
            .take(HEADER_SCAN_LINES)
            .filter(|line| import.is_match(line.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Byte offsets at which a new logical block starts.
    ///
    /// Every offset points at a `\n`; offset 0 is never included.
    pub fn block_starts(&self, text: &str) -> Vec<usize> {
        let boundary = &self.rules().boundary;
        text.match_indices('\n')
            .map(|(pos, _)| pos)
            .filter(|&pos| pos > 0 && boundary.is_match(&text[pos..]))
            .collect()
    }
}
