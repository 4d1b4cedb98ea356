//! File discovery for batch runs
//!
//! Walks a directory tree with an explicit work-list rather than recursion,
//! so deep trees cannot exhaust the call stack.

use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Spectra are frequently written on case-insensitive filesystems
const MASK_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Collects files whose names match a glob mask under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    pattern: Pattern,
}

impl DirectoryScanner {
    pub fn new(mask: &str) -> Result<Self> {
        let pattern = Pattern::new(mask).map_err(|e| {
            IngestError::configuration(format!("invalid file mask '{}': {}", mask, e))
        })?;
        Ok(Self { pattern })
    }

    pub fn mask(&self) -> &str {
        self.pattern.as_str()
    }

    /// Depth-first scan of `root`.
    ///
    /// Every subdirectory is visited; only non-directory entries are matched
    /// against the mask. An unreadable root yields an empty list, so callers
    /// cannot tell "no files" from "could not scan". Unreadable
    /// subdirectories are skipped. Ordering is unspecified.
    pub fn scan(&self, root: &Path) -> Vec<PathBuf> {
        let root = match std::path::absolute(root) {
            Ok(root) => root,
            Err(e) => {
                debug!("Cannot resolve {}: {}", root.display(), e);
                return Vec::new();
            }
        };

        let mut directories = vec![root.clone()];
        let mut files = Vec::new();

        while let Some(directory) = directories.pop() {
            let entries = match fs::read_dir(&directory) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!("Cannot read {}: {}", directory.display(), e);
                    continue;
                }
            };

            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let name = file_name.to_string_lossy();
                if name == "." || name == ".." {
                    continue;
                }

                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    directories.push(entry.path());
                } else if self.pattern.matches_with(&name, MASK_OPTIONS) {
                    files.push(entry.path());
                }
            }
        }

        debug!(
            "Found {} files matching {} under {}",
            files.len(),
            self.mask(),
            root.display()
        );
        files
    }
}

/// Sorted set of files for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFileSet {
    files: Vec<PathBuf>,
}

impl DiscoveredFileSet {
    /// Scan `root` and sort by the full path string, byte by byte
    pub fn discover(root: &Path, mask: &str) -> Result<Self> {
        let scanner = DirectoryScanner::new(mask)?;
        let mut files = scanner.scan(root);
        files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.files
    }
}

impl<'a> IntoIterator for &'a DiscoveredFileSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Helper to create a small spectra tree
    fn create_test_tree(temp_dir: &TempDir) -> PathBuf {
        let root = temp_dir.path().join("spectra");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.csv"), "1,10\n2,20\n").unwrap();
        fs::write(root.join("sub").join("b.csv"), "1,10\n2,20\n").unwrap();
        fs::write(root.join("c.txt"), "notes").unwrap();
        root
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        let root = std::path::absolute(root).unwrap();
        files
            .iter()
            .map(|p| {
                p.strip_prefix(&root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_scan_matches_mask_in_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let root = create_test_tree(&temp_dir);

        let set = DiscoveredFileSet::discover(&root, "*.csv").unwrap();

        assert_eq!(names(&root, set.as_slice()), vec!["a.csv", "sub/b.csv"]);
    }

    #[test]
    fn test_scan_returns_absolute_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = create_test_tree(&temp_dir);

        let files = DirectoryScanner::new("*.csv").unwrap().scan(&root);

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_discovered_files_are_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        for name in ["z-01.csv", "m-01.csv", "a-01.csv"] {
            fs::write(root.join(name), "1,1\n").unwrap();
        }
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("b").join("x-01.csv"), "1,1\n").unwrap();

        let set = DiscoveredFileSet::discover(&root, "*.csv").unwrap();

        assert_eq!(
            names(&root, set.as_slice()),
            vec!["a-01.csv", "b/x-01.csv", "m-01.csv", "z-01.csv"]
        );
    }

    #[test]
    fn test_sort_compares_whole_path_strings() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        for dir in ["a", "a.b"] {
            fs::create_dir_all(root.join(dir)).unwrap();
            fs::write(root.join(dir).join("x.csv"), "1,1\n").unwrap();
        }

        let set = DiscoveredFileSet::discover(&root, "*.csv").unwrap();

        // '.' sorts before '/', so the dotted directory comes first
        assert_eq!(names(&root, set.as_slice()), vec!["a.b/x.csv", "a/x.csv"]);
    }

    #[test]
    fn test_mask_is_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("UPPER.CSV"), "1,1\n").unwrap();

        let files = DirectoryScanner::new("*.csv").unwrap().scan(temp_dir.path());
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_directories_matching_mask_are_not_files() {
        let temp_dir = TempDir::new().unwrap();
        let odd = temp_dir.path().join("folder.csv");
        fs::create_dir_all(&odd).unwrap();
        fs::write(odd.join("inner.csv"), "1,1\n").unwrap();

        let files = DirectoryScanner::new("*.csv").unwrap().scan(temp_dir.path());

        assert_eq!(files, vec![std::path::absolute(odd.join("inner.csv")).unwrap()]);
    }

    #[test]
    fn test_deep_tree() {
        let temp_dir = TempDir::new().unwrap();
        let mut dir = temp_dir.path().to_path_buf();
        for level in 0..64 {
            dir = dir.join(format!("level{}", level));
        }
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("deep.csv"), "1,1\n").unwrap();

        let files = DirectoryScanner::new("*.csv").unwrap().scan(temp_dir.path());
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_missing_root_is_empty_not_error() {
        let temp_dir = TempDir::new().unwrap();
        let set = DiscoveredFileSet::discover(&temp_dir.path().join("missing"), "*.csv").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_invalid_mask() {
        assert!(matches!(
            DirectoryScanner::new("[a-"),
            Err(IngestError::Configuration { .. })
        ));
    }
}
