//! Pipeline tests
//!
//! Exercise batch and streaming runs against an in-memory matcher that
//! records the open/search/close lifecycle.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{IngestConfig, OutputFormat};
use crate::error::{IngestError, Result};
use crate::matcher::{Match, Matcher, SearchHandle, SearchRequest};

pub mod error_handling;

/// Matcher double that returns scripted matches and tracks handles
#[derive(Debug, Default)]
pub struct RecordingMatcher {
    next_id: u64,
    pub open_handles: HashSet<u64>,
    pub opens: usize,
    pub closes: usize,
    /// Point count of every search, in call order
    pub searches: Vec<usize>,
    /// Max results requested by every search
    pub requested: Vec<usize>,
    pub matches: Vec<Match>,
    pub fail_open: bool,
    /// Fail the search with this one-based call number
    pub fail_search_on: Option<usize>,
}

impl RecordingMatcher {
    pub fn returning(matches: &[(&str, f64)]) -> Self {
        Self {
            matches: matches
                .iter()
                .map(|(name, confidence)| Match {
                    name: name.to_string(),
                    confidence_percent: *confidence,
                    is_license_expired: false,
                })
                .collect(),
            ..Default::default()
        }
    }
}

impl Matcher for RecordingMatcher {
    fn open(&mut self) -> Result<SearchHandle> {
        if self.fail_open {
            return Err(IngestError::matcher_open("library not loaded"));
        }
        self.next_id += 1;
        self.opens += 1;
        self.open_handles.insert(self.next_id);
        Ok(SearchHandle::new(self.next_id))
    }

    fn search(&mut self, handle: &SearchHandle, request: &SearchRequest<'_>) -> Result<Vec<Match>> {
        assert!(self.open_handles.contains(&handle.id()));
        assert_eq!(request.x.len(), request.y.len());
        self.searches.push(request.len());
        self.requested.push(request.max_results);

        if self.fail_search_on == Some(self.searches.len()) {
            return Err(IngestError::matcher_search("engine returned status 7"));
        }
        Ok(self.matches.clone())
    }

    fn close(&mut self, handle: SearchHandle) -> Result<()> {
        self.closes += 1;
        self.open_handles.remove(&handle.id());
        Ok(())
    }
}

/// Configuration for pipeline tests: JSON lines, no progress bar
pub fn test_config() -> IngestConfig {
    colored::control::set_override(false);
    IngestConfig::default()
        .with_engine("/unused/in/tests")
        .with_output_format(OutputFormat::Json)
}

/// Write `content` to `relative` under `root`, creating parent directories
pub fn write_spectrum(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Parse JSON-lines output into values
pub fn json_lines(output: Vec<u8>) -> Vec<serde_json::Value> {
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
