//! Line classification shared by the file and stream dialects
//!
//! Lines arrive trimmed. These helpers only classify and tokenize; deciding
//! whether a bad line abandons a file or fails a session is up to the caller.

use crate::constants::{COMMENT_PREFIXES, FIELD_SEPARATOR, MAX_MATCHES, metadata_keys};
use crate::models::Measurement;

/// Request metadata carried inline as `field, value`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metadata {
    Pixels(usize),
    MaxResults(usize),
    /// Stored as a fraction; the wire carries a percentage
    MinConfidence(f64),
}

impl Metadata {
    pub fn apply(self, measurement: &mut Measurement) {
        match self {
            Metadata::Pixels(pixels) => measurement.pixels = pixels,
            Metadata::MaxResults(max_results) => measurement.max_results = max_results,
            Metadata::MinConfidence(fraction) => measurement.min_confidence = fraction,
        }
    }
}

pub fn is_comment(line: &str) -> bool {
    line.starts_with(COMMENT_PREFIXES)
}

/// Data rows start with a digit or a minus sign
pub fn starts_numeric(line: &str) -> bool {
    line.chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-')
}

pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(FIELD_SEPARATOR).collect()
}

/// Recognise a metadata line.
///
/// Returns `None` when the first field is not a metadata key, otherwise the
/// parsed value or a reason it could not be parsed.
pub fn parse_metadata(fields: &[&str]) -> Option<Result<Metadata, String>> {
    if fields.len() < 2 {
        return None;
    }

    let key = fields[0].trim().to_lowercase();
    let value = fields[1].trim();

    if metadata_keys::PIXELS.contains(&key.as_str()) {
        return Some(parse_count(value, "pixel count").and_then(|pixels| {
            if pixels == 0 {
                Err("pixel count must be positive".to_string())
            } else {
                Ok(Metadata::Pixels(pixels))
            }
        }));
    }

    if key == metadata_keys::MAX_RESULTS {
        return Some(parse_count(value, "max_results").and_then(|max_results| {
            if (1..=MAX_MATCHES).contains(&max_results) {
                Ok(Metadata::MaxResults(max_results))
            } else {
                Err(format!("max_results must be between 1 and {}", MAX_MATCHES))
            }
        }));
    }

    if key == metadata_keys::MIN_CONFIDENCE {
        return Some(parse_number(value).and_then(|percent| {
            if (0.0..=100.0).contains(&percent) {
                Ok(Metadata::MinConfidence(percent / 100.0))
            } else {
                Err(format!("min_confidence {} outside 0-100", percent))
            }
        }));
    }

    None
}

/// Parse the first two fields as an (x, y) pair
pub fn parse_pair(fields: &[&str]) -> Result<(f64, f64), String> {
    match fields {
        [x, y, ..] => Ok((parse_number(x)?, parse_number(y)?)),
        _ => Err(format!("expected at least 2 fields, found {}", fields.len())),
    }
}

fn parse_number(token: &str) -> Result<f64, String> {
    let token = token.trim();
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(format!("'{}' is not a finite number", token)),
        Err(_) => Err(format!("'{}' is not a number", token)),
    }
}

fn parse_count(value: &str, what: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("invalid {} '{}'", what, value))
}
