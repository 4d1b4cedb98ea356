//! Command-line argument definitions
//!
//! Flags override the layered configuration (defaults, JSON file,
//! environment); anything left unset keeps the configured value.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{IngestConfig, OutputFormat};
use crate::matcher::Technique;

/// Feed spectra to an external spectral-matching engine
///
/// Batch mode scans a directory tree for CSV spectra and searches each one.
/// Streaming mode reads requests from stdin until QUIT or end of input.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "spectral-ingest",
    version,
    about = "Submit spectral measurements from CSV files or stdin to a spectral-matching engine",
    long_about = "Reads wavenumber/intensity spectra either from every CSV file under a directory \
                  (batch mode) or from a line protocol on stdin (streaming mode), submits each \
                  measurement to an external matching engine, and reports ranked matches."
)]
pub struct Args {
    /// Read requests from stdin
    ///
    /// Sessions are either bounded by REQUEST_START / REQUEST_END lines or end
    /// once `pixels` data rows have been read. A QUIT line stops the run.
    #[arg(long = "streaming", conflicts_with = "nostreaming")]
    pub streaming: bool,

    /// Scan a directory for CSV files (default)
    #[arg(long = "nostreaming")]
    pub nostreaming: bool,

    /// Root directory for batch mode
    #[arg(
        short = 'd',
        long = "directory",
        value_name = "PATH",
        help = "Root directory for batch mode [default: .]"
    )]
    pub directory: Option<PathBuf>,

    /// Glob matched against file names at every level
    #[arg(
        long = "mask",
        value_name = "GLOB",
        help = "File name mask for batch mode [default: *.csv]"
    )]
    pub mask: Option<String>,

    /// Matching engine executable
    ///
    /// Receives `x,y` lines on stdin and writes `confidence,expired,name`
    /// lines on stdout.
    #[arg(short = 'e', long = "engine", value_name = "PATH")]
    pub engine: Option<PathBuf>,

    /// Extra argument passed to the engine (repeatable)
    #[arg(
        long = "engine-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        action = clap::ArgAction::Append
    )]
    pub engine_args: Vec<String>,

    /// JSON configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Expected points per count-bounded session
    #[arg(long = "pixels", value_name = "COUNT")]
    pub pixels: Option<usize>,

    /// Maximum matches to request per measurement
    #[arg(long = "max-results", value_name = "COUNT")]
    pub max_results: Option<usize>,

    /// Minimum match confidence in percent
    #[arg(long = "min-confidence", value_name = "PERCENT")]
    pub min_confidence: Option<f64>,

    /// Library technique to search
    #[arg(long = "technique", value_enum)]
    pub technique: Option<Technique>,

    /// Output format for results on stdout
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Score matches against sample names taken from `<sample>-<NN>.csv`
    #[arg(long = "evaluate")]
    pub evaluate: bool,

    /// Parse and validate without calling the engine
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Args {
    /// Overlay flags that were given onto `config`
    pub fn apply_to(&self, mut config: IngestConfig) -> IngestConfig {
        if self.streaming {
            config.streaming = true;
        } else if self.nostreaming {
            config.streaming = false;
        }
        if let Some(directory) = &self.directory {
            config.directory = directory.clone();
        }
        if let Some(mask) = &self.mask {
            config.file_mask = mask.clone();
        }
        if let Some(engine) = &self.engine {
            config.matcher.engine = Some(engine.clone());
        }
        if !self.engine_args.is_empty() {
            config.matcher.engine_args = self.engine_args.clone();
        }
        if let Some(pixels) = self.pixels {
            config.defaults.pixels = pixels;
        }
        if let Some(max_results) = self.max_results {
            config.defaults.max_results = max_results;
        }
        if let Some(percent) = self.min_confidence {
            config.defaults.min_confidence = percent / 100.0;
        }
        if let Some(technique) = self.technique {
            config.matcher.search.technique = technique;
        }
        if let Some(format) = self.format {
            config.output_format = format;
        }
        config.evaluate |= self.evaluate;
        config.dry_run |= self.dry_run;
        config
    }

    /// Get the appropriate log level based on verbosity settings
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Progress bars are hidden in quiet mode and while streaming
    pub fn show_progress(&self, config: &IngestConfig) -> bool {
        !self.quiet && !config.streaming
    }
}
