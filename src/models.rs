//! Core data structures for measurement ingestion.
//!
//! A [`Measurement`] is built fresh for each file or streaming session,
//! handed to the matcher, and dropped.

use crate::constants::{DEFAULT_MAX_RESULTS, DEFAULT_MIN_CONFIDENCE, DEFAULT_PIXELS, MIN_POINTS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Request parameters a measurement starts with before any metadata line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementDefaults {
    /// Expected sample count
    pub pixels: usize,
    /// Maximum matches to request
    pub max_results: usize,
    /// Minimum confidence as a fraction in (0, 1)
    pub min_confidence: f64,
}

impl Default for MeasurementDefaults {
    fn default() -> Self {
        Self {
            pixels: DEFAULT_PIXELS,
            max_results: DEFAULT_MAX_RESULTS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// What ends a parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseBound {
    /// File mode: runs to end of input
    EndOfInput,
    /// Stream session ending once `pixels` data rows were read
    PixelCount,
    /// Stream session bracketed by `REQUEST_START` / `REQUEST_END`
    Marker,
}

/// A data row that caused a file-mode measurement to be abandoned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub content: String,
    pub reason: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} [{}]", self.line, self.reason, self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) enum Completion {
    Incomplete,
    Complete,
    Rejected(RowError),
}

/// One spectrum submission: coordinate arrays plus request metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub pixels: usize,
    pub max_results: usize,
    pub min_confidence: f64,
    /// Wavenumbers
    pub x: Vec<f64>,
    /// Intensities
    pub y: Vec<f64>,
    /// Set in file mode only
    pub source_path: Option<PathBuf>,
    /// `QUIT` was read; not a parse failure
    pub is_termination_signal: bool,
    bound: ParseBound,
    completion: Completion,
}

impl Measurement {
    pub fn new(bound: ParseBound, defaults: &MeasurementDefaults) -> Self {
        Self {
            pixels: defaults.pixels,
            max_results: defaults.max_results,
            min_confidence: defaults.min_confidence,
            x: Vec::new(),
            y: Vec::new(),
            source_path: None,
            is_termination_signal: false,
            bound,
            completion: Completion::Incomplete,
        }
    }

    /// A measurement carrying only the streaming quit sentinel
    pub fn termination(defaults: &MeasurementDefaults) -> Self {
        let mut measurement = Self::new(ParseBound::PixelCount, defaults);
        measurement.is_termination_signal = true;
        measurement
    }

    pub fn bound(&self) -> ParseBound {
        self.bound
    }

    /// Number of (x, y) pairs read
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.x.push(x);
        self.y.push(y);
    }

    /// The row that abandoned this measurement, if any
    pub fn row_error(&self) -> Option<&RowError> {
        match &self.completion {
            Completion::Rejected(err) => Some(err),
            _ => None,
        }
    }

    pub(crate) fn mark_complete(&mut self) {
        self.completion = Completion::Complete;
    }

    pub(crate) fn reject(&mut self, error: RowError) {
        self.completion = Completion::Rejected(error);
    }

    pub(crate) fn set_bound(&mut self, bound: ParseBound) {
        self.bound = bound;
    }

    /// Whether parsing reached its bound rather than running out of input
    pub fn is_complete(&self) -> bool {
        match self.bound {
            ParseBound::PixelCount => self.x.len() == self.pixels,
            ParseBound::EndOfInput | ParseBound::Marker => {
                self.completion == Completion::Complete
            }
        }
    }

    /// Valid measurements are the only ones batch mode submits
    pub fn is_valid(&self) -> bool {
        !self.is_termination_signal
            && self.x.len() == self.y.len()
            && self.x.len() >= MIN_POINTS
            && self.is_complete()
    }

    /// Short label for logs and reports
    pub fn source_label(&self) -> String {
        match &self.source_path {
            Some(path) => path.display().to_string(),
            None => "stdin".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(bound: ParseBound, points: usize) -> Measurement {
        let mut m = Measurement::new(bound, &MeasurementDefaults::default());
        for i in 0..points {
            m.push(i as f64, (i * 10) as f64);
        }
        m
    }

    #[test]
    fn test_defaults() {
        let m = Measurement::new(ParseBound::EndOfInput, &MeasurementDefaults::default());
        assert_eq!(m.pixels, 1024);
        assert_eq!(m.max_results, 20);
        assert!((m.min_confidence - 0.60).abs() < f64::EPSILON);
        assert!(m.is_empty());
        assert!(!m.is_valid());
    }

    #[test]
    fn test_file_measurement_needs_completion() {
        let mut m = filled(ParseBound::EndOfInput, 3);
        assert!(!m.is_valid());
        m.mark_complete();
        assert!(m.is_valid());
    }

    #[test]
    fn test_single_point_is_invalid() {
        let mut m = filled(ParseBound::EndOfInput, 1);
        m.mark_complete();
        assert!(!m.is_valid());
    }

    #[test]
    fn test_rejected_measurement_is_invalid() {
        let mut m = filled(ParseBound::EndOfInput, 5);
        m.reject(RowError {
            line: 6,
            content: "abc,1".to_string(),
            reason: "not a number".to_string(),
        });
        assert!(!m.is_valid());
        assert_eq!(m.row_error().map(|e| e.line), Some(6));
    }

    #[test]
    fn test_pixel_count_validity() {
        let mut m = filled(ParseBound::PixelCount, 3);
        m.pixels = 3;
        assert!(m.is_valid());
        m.pixels = 4;
        assert!(!m.is_valid());
    }

    #[test]
    fn test_marker_validity_ignores_pixels() {
        let mut m = filled(ParseBound::Marker, 2);
        assert!(!m.is_valid());
        m.mark_complete();
        assert!(m.is_valid());
        assert_eq!(m.pixels, 1024);
    }

    #[test]
    fn test_termination_is_never_valid() {
        let m = Measurement::termination(&MeasurementDefaults::default());
        assert!(m.is_termination_signal);
        assert!(!m.is_valid());
    }
}
