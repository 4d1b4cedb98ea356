//! Error handling for measurement ingestion and matching.
//!
//! Distinguishes failures that abandon a single file from failures that tear
//! down a streaming session.
//! Scan absence and the `QUIT` termination signal are not errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Row {line} of {path} rejected: {reason} [{content}]")]
    RowParse {
        path: PathBuf,
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Protocol error at stream line {line}: {reason} [{content}]")]
    Protocol {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Failed to open matcher: {message}")]
    MatcherOpen { message: String },

    #[error("Matcher search failed: {message}")]
    MatcherSearch { message: String },

    #[error("Failed to close matcher handle: {message}")]
    MatcherClose { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },

    #[error("Failed to write report: {source}")]
    Report {
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl IngestError {
    /// Create an I/O error tied to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a stream protocol error
    pub fn protocol(line: usize, content: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            line,
            content: content.into(),
            reason: reason.into(),
        }
    }

    pub fn matcher_open(message: impl Into<String>) -> Self {
        Self::MatcherOpen {
            message: message.into(),
        }
    }

    pub fn matcher_search(message: impl Into<String>) -> Self {
        Self::MatcherSearch {
            message: message.into(),
        }
    }

    pub fn matcher_close(message: impl Into<String>) -> Self {
        Self::MatcherClose {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an error for a failed write to the report sink
    pub fn report(source: std::io::Error) -> Self {
        Self::Report { source }
    }

    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
