//! Protocol tokens, default values and limits
//!
//! Shared by the parser, the processing pipeline and the CLI so the wire
//! vocabulary lives in one place.

// =============================================================================
// Stream Protocol Tokens
// =============================================================================

/// Opens a marker-bounded request when it is the first line of a session
pub const REQUEST_START: &str = "REQUEST_START";

/// Closes a marker-bounded request
pub const REQUEST_END: &str = "REQUEST_END";

/// Ends the whole streaming loop (matched by prefix)
pub const QUIT: &str = "QUIT";

/// Field separator for data and metadata lines
pub const FIELD_SEPARATOR: char = ',';

/// First characters that mark a comment line
pub const COMMENT_PREFIXES: &[char] = &['#', '/', '\''];

/// Metadata keys, compared case-insensitively after trimming
pub mod metadata_keys {
    pub const PIXELS: &[&str] = &["pixels", "pixel count"];
    pub const MAX_RESULTS: &str = "max_results";
    pub const MIN_CONFIDENCE: &str = "min_confidence";
}

// =============================================================================
// Measurement Defaults
// =============================================================================

/// Expected sample count when no `pixels` line is seen
pub const DEFAULT_PIXELS: usize = 1024;

/// Maximum matches requested from the engine
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Minimum confidence, as a fraction
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.60;

/// The engine never returns more than this many matches
pub const MAX_MATCHES: usize = 50;

/// Fewest points a spectrum needs to be searchable
pub const MIN_POINTS: usize = 2;

// =============================================================================
// Discovery
// =============================================================================

/// Files picked up in batch mode
pub const DEFAULT_FILE_MASK: &str = "*.csv";

/// Batch root when none is given
pub const DEFAULT_DIRECTORY: &str = ".";

// =============================================================================
// Environment
// =============================================================================

pub mod env_vars {
    pub const ENGINE: &str = "SPECTRAL_INGEST_ENGINE";
    pub const DIRECTORY: &str = "SPECTRAL_INGEST_DIRECTORY";
    pub const MASK: &str = "SPECTRAL_INGEST_MASK";
}

// =============================================================================
// Evaluation
// =============================================================================

/// Alternate compound names treated as equivalent when scoring matches
pub const DEFAULT_SYNONYMS: &[&[&str]] = &[
    &["Acetaminophen", "4-Acetamidophenol"],
    &["BMSB", "1,4-Bis(2-methylstyryl)benzene"],
    &["isopropanol", "2-propanol", "lsopropyl alcohol"],
    &["MEK", "2-Butanone"],
];

/// Sample name inferred from `<sample>-<NN>.csv`
pub const SAMPLE_NAME_PATTERN: &str = r"([^\\/]+)-\d+\.csv$";
