//! Spectral measurement ingestion
//!
//! Reads wavenumber/intensity spectra and submits each one to an external
//! spectral-matching engine, reporting ranked matches.
//!
//! This library provides tools for:
//! - Parsing plain CSV spectra and the line-oriented streaming protocol
//! - Discovering spectra under a directory tree without recursion
//! - Driving a [`Matcher`] through its open/search/close lifecycle
//! - Reporting matches as text, JSON lines or CSV, with optional evaluation
//!   against sample names

pub mod config;
pub mod constants;
pub mod error;
pub mod matcher;
pub mod models;
pub mod parser;
pub mod processor;
pub mod report;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{IngestConfig, OutputFormat};
pub use error::{IngestError, Result};
pub use matcher::{CommandMatcher, Match, Matcher, SearchHandle, SearchRequest, run_search};
pub use models::{Measurement, MeasurementDefaults, ParseBound};
pub use parser::{FileParser, StreamParser};
pub use processor::Pipeline;
pub use processor::discovery::{DirectoryScanner, DiscoveredFileSet};
pub use report::{MatchReport, Reporter, RunSummary};
