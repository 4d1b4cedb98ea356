//! Configuration management and validation.
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! environment variables, then command-line flags (applied by the CLI).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{
    DEFAULT_DIRECTORY, DEFAULT_FILE_MASK, DEFAULT_SYNONYMS, MAX_MATCHES, MIN_POINTS, env_vars,
};
use crate::error::{IngestError, Result};
use crate::matcher::SearchSettings;
use crate::models::MeasurementDefaults;

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// One JSON object per measurement
    Json,
    /// One CSV row per measurement
    Csv,
}

/// External engine binding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Engine executable; required unless running dry
    pub engine: Option<PathBuf>,
    /// Extra arguments passed before the search flags
    pub engine_args: Vec<String>,
    #[serde(flatten)]
    pub search: SearchSettings,
}

/// Global configuration for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Read requests from stdin instead of scanning a directory
    pub streaming: bool,

    /// Root of the batch scan
    pub directory: PathBuf,

    /// Glob matched against entries at every directory level
    pub file_mask: String,

    /// Request parameters before any metadata line
    pub defaults: MeasurementDefaults,

    pub matcher: MatcherConfig,

    pub output_format: OutputFormat,

    /// Score matches against sample names taken from file names
    pub evaluate: bool,

    /// Groups of compound names treated as the same sample
    pub synonyms: Vec<Vec<String>>,

    /// Parse and validate without calling the engine
    pub dry_run: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            streaming: false,
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            file_mask: DEFAULT_FILE_MASK.to_string(),
            defaults: MeasurementDefaults::default(),
            matcher: MatcherConfig::default(),
            output_format: OutputFormat::default(),
            evaluate: false,
            synonyms: DEFAULT_SYNONYMS
                .iter()
                .map(|group| group.iter().map(|name| name.to_string()).collect())
                .collect(),
            dry_run: false,
        }
    }
}

impl IngestConfig {
    /// Load defaults, an optional JSON file, then the process environment
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a JSON configuration file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            IngestError::configuration(format!("invalid config file {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(engine) = lookup(env_vars::ENGINE) {
            debug!("{} overrides engine", env_vars::ENGINE);
            self.matcher.engine = Some(PathBuf::from(engine));
        }
        if let Some(directory) = lookup(env_vars::DIRECTORY) {
            self.directory = PathBuf::from(directory);
        }
        if let Some(mask) = lookup(env_vars::MASK) {
            self.file_mask = mask;
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_file_mask(mut self, mask: impl Into<String>) -> Self {
        self.file_mask = mask.into();
        self
    }

    pub fn with_engine(mut self, engine: impl Into<PathBuf>) -> Self {
        self.matcher.engine = Some(engine.into());
        self
    }

    pub fn with_defaults(mut self, defaults: MeasurementDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_evaluation(mut self) -> Self {
        self.evaluate = true;
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Check ranges and cross-field requirements
    pub fn validate(&self) -> Result<()> {
        let defaults = &self.defaults;

        if defaults.pixels < MIN_POINTS {
            return Err(IngestError::configuration(format!(
                "pixels must be at least {}, got {}",
                MIN_POINTS, defaults.pixels
            )));
        }

        if !(1..=MAX_MATCHES).contains(&defaults.max_results) {
            return Err(IngestError::configuration(format!(
                "max_results must be between 1 and {}, got {}",
                MAX_MATCHES, defaults.max_results
            )));
        }

        if !(defaults.min_confidence > 0.0 && defaults.min_confidence < 1.0) {
            return Err(IngestError::configuration(format!(
                "min_confidence must be a fraction between 0 and 1, got {}",
                defaults.min_confidence
            )));
        }

        glob::Pattern::new(&self.file_mask).map_err(|e| {
            IngestError::configuration(format!("invalid file mask '{}': {}", self.file_mask, e))
        })?;

        if !self.dry_run && self.matcher.engine.is_none() {
            return Err(IngestError::configuration(format!(
                "no matching engine configured (use --engine or {})",
                env_vars::ENGINE
            )));
        }

        if self.evaluate && self.streaming {
            return Err(IngestError::configuration(
                "evaluation needs file names and is only available in batch mode",
            ));
        }

        Ok(())
    }
}
