//! Local repository scanner.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::SourceError;
use crate::models::{IndexingConfig, SourceFile};
use crate::services::loader::load_content;
use crate::utils::file::{extension_of, relative_path};

/// Directories never descended into.
pub const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".idea",
    ".vscode",
    "target",
];

/// Files of one repository checkout on disk.
#[derive(Debug)]
pub struct LocalSource {
    /// Root path to scan
    root: PathBuf,

    /// Globs matched against repository-relative paths
    exclude_patterns: Vec<glob::Pattern>,

    /// Lowercase extensions without the dot
    extensions: HashSet<String>,

    max_file_size: u64,

    follow_symlinks: bool,
}

impl LocalSource {
    pub fn new(
        root: impl Into<PathBuf>,
        exclude_patterns: &[String],
        extensions: &[String],
        max_file_size: u64,
    ) -> Result<Self, SourceError> {
        let root = root.into();
        if !root.exists() {
            return Err(SourceError::NotFound(root.display().to_string()));
        }

        let exclude_patterns = exclude_patterns
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|e| SourceError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let extensions = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();

        Ok(Self {
            root,
            exclude_patterns,
            extensions,
            max_file_size,
            follow_symlinks: false,
        })
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Source for `root` using the configured filters plus `extra_excludes`.
    pub fn from_config(
        root: impl Into<PathBuf>,
        config: &IndexingConfig,
        extra_excludes: &[String],
    ) -> Result<Self, SourceError> {
        let mut excludes = config.exclude_patterns.clone();
        excludes.extend(extra_excludes.iter().cloned());
        Self::new(root, &excludes, &config.extensions, config.max_file_size)
            .map(|source| source.with_follow_symlinks(config.follow_symlinks))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collect indexable files under the root in a stable order.
    ///
    /// Entries that cannot be read are logged and skipped.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        if !self.root.exists() {
            return Err(SourceError::NotFound(self.root.display().to_string()));
        }
        if self.root.is_file() {
            return Ok(if self.has_supported_extension(&self.root) {
                vec![self.root.clone()]
            } else {
                Vec::new()
            });
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        path = ?e.path(),
                        error = %e,
                        "skipping unreadable entry"
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.has_supported_extension(path) {
                continue;
            }

            let Some(relative) = relative_path(&self.root, path) else {
                continue;
            };
            if self.is_excluded(&relative) {
                debug!(path = %relative, "excluded by pattern");
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    /// Load every indexable file, dropping those with no usable text.
    pub fn load(&self) -> Result<Vec<SourceFile>, SourceError> {
        Ok(self
            .collect_files()?
            .iter()
            .filter_map(|path| self.read_source_file(path))
            .collect())
    }

    /// Read one file as a [`SourceFile`] keyed by its repository-relative path.
    pub fn read_source_file(&self, path: &Path) -> Option<SourceFile> {
        let name = if self.root.is_file() {
            path.file_name()?.to_string_lossy().into_owned()
        } else {
            relative_path(&self.root, path)?
        };

        let content = load_content(path, self.max_file_size);
        if content.trim().is_empty() {
            debug!(path = %name, "skipping file without text");
            return None;
        }
        Some(SourceFile::new(name, content))
    }

    fn has_supported_extension(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions.contains(&ext))
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.exclude_patterns.iter().any(|p| p.matches(relative))
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_filters_and_relativizes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/app.py", "def main():\n    pass\n");
        write(root, "README.md", "# Demo\n");
        write(root, "image.png", "not really an image");
        write(root, "blank.txt", "   \n");
        write(root, ".git/config.txt", "[core]\n");
        write(root, "node_modules/lib/index.js", "module.exports = 1;\n");
        write(root, "target/debug/build.rs", "fn main() {}\n");

        let source = LocalSource::new(root, &[], &exts(&["py", ".MD", "txt", "js", "rs"]), 1024)
            .unwrap();
        let files = source.load().unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths, vec!["README.md", "src/app.py"]);
        assert_eq!(files[1].content, "def main():\n    pass\n");
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "web/app.min.js", "x");
        write(root, "web/app.js", "let x = 1;\n");
        write(root, "vendor/dep/lib.js", "let y = 2;\n");

        let source = LocalSource::new(
            root,
            &exts(&["**/*.min.js", "vendor/**"]),
            &exts(&["js"]),
            1024,
        )
        .unwrap();
        let files = source.collect_files().unwrap();
        assert_eq!(files, vec![root.join("web/app.js")]);
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.md", "hello\n");

        let source =
            LocalSource::new(dir.path().join("notes.md"), &[], &exts(&["md"]), 1024).unwrap();
        let files = source.load().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "notes.md");
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entries_do_not_stop_scan() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a/first.py", "x = 1\n");
        write(root, "z/last.py", "y = 2\n");
        symlink(root.join("missing.py"), root.join("a/dangling.py")).unwrap();
        symlink(root, root.join("a/loop")).unwrap();

        let source = LocalSource::new(root, &[], &exts(&["py"]), 1024)
            .unwrap()
            .with_follow_symlinks(true);
        let files = source.load().unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths, vec!["a/first.py", "z/last.py"]);
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalSource::new(dir.path().join("nope"), &[], &[], 1024).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalSource::new(dir.path(), &exts(&["[unclosed"]), &[], 1024).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPattern { .. }));
    }
}
