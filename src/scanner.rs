use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::error::{HistoryError, Result};

/// Directory scanner: lists files under a source directory whose path relative
/// to that directory matches a glob such as `*.md` or `*/*.json`.
#[derive(Clone, Default)]
pub struct FileScanner;

impl FileScanner {
    pub fn new() -> Self {
        Self
    }

    /// Matching files sorted by path. A missing root yields an empty list.
    pub fn scan(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let matcher = build_matcher(pattern)?;
        let depth = pattern.split('/').count();

        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .min_depth(depth)
            .max_depth(depth)
            .follow_links(true)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .map(|rel| matches(&matcher, rel))
                    .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        Ok(files)
    }

    /// Names of the immediate subdirectories of `root`, sorted.
    pub fn subdirs(&self, root: &Path) -> Vec<String> {
        if !root.is_dir() {
            return Vec::new();
        }
        let mut names: Vec<String> = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn build_matcher(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| HistoryError::Config(format!("bad glob {pattern}: {e}")))
}

fn matches(matcher: &GlobMatcher, rel: &Path) -> bool {
    if matcher.is_match(rel) {
        return true;
    }
    let normalized = rel.to_string_lossy().replace('\\', "/");
    matcher.is_match(normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        std::fs::write(path, b"test").unwrap();
    }

    #[test]
    fn scan_one_level_by_extension() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.md"));
        touch(&root.join("a.md"));
        touch(&root.join("notes.txt"));
        std::fs::create_dir_all(root.join("nested")).unwrap();
        touch(&root.join("nested/c.md"));

        let files = FileScanner::new().scan(root, "*.md").unwrap();
        assert_eq!(files, vec![root.join("a.md"), root.join("b.md")]);
    }

    #[test]
    fn scan_two_levels_and_list_groups() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("team-b")).unwrap();
        std::fs::create_dir_all(root.join("team-a")).unwrap();
        touch(&root.join("team-a/1.json"));
        touch(&root.join("team-b/2.json"));
        touch(&root.join("team-b/readme.md"));
        touch(&root.join("stray.json"));

        let scanner = FileScanner::new();
        let files = scanner.scan(root, "*/*.json").unwrap();
        assert_eq!(
            files,
            vec![root.join("team-a/1.json"), root.join("team-b/2.json")]
        );
        assert_eq!(scanner.subdirs(root), vec!["team-a", "team-b"]);
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let scanner = FileScanner::new();
        assert!(scanner.scan(&missing, "*.json").unwrap().is_empty());
        assert!(scanner.subdirs(&missing).is_empty());
    }
}
