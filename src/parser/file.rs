//! File-mode parsing: one CSV spectrum per file, bounded by end of input

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use super::line::{is_comment, parse_metadata, parse_pair, split_fields, starts_numeric};
use crate::error::{IngestError, Result};
use crate::models::{Measurement, MeasurementDefaults, ParseBound, RowError};

/// Parser for plain `x, y` CSV files
///
/// A malformed data row abandons the whole file: the returned measurement
/// carries the offending row and reports itself invalid. Only I/O failures
/// come back as `Err`.
#[derive(Debug, Clone, Default)]
pub struct FileParser {
    defaults: MeasurementDefaults,
}

impl FileParser {
    pub fn new(defaults: MeasurementDefaults) -> Self {
        Self { defaults }
    }

    /// Open and parse a CSV file
    pub fn parse_path(&self, path: &Path) -> Result<Measurement> {
        let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
        self.parse_reader(BufReader::new(file), Some(path))
    }

    /// Parse any line source; `source` is recorded on the measurement
    pub fn parse_reader<R: BufRead>(&self, reader: R, source: Option<&Path>) -> Result<Measurement> {
        let mut measurement = Measurement::new(ParseBound::EndOfInput, &self.defaults);
        measurement.source_path = source.map(Path::to_path_buf);
        let label = measurement.source_label();

        // Bytes outside UTF-8 (Latin-1 degree signs and the like) decode lossily
        for (index, line) in reader.split(b'\n').enumerate() {
            let line_number = index + 1;
            let raw = line.map_err(|e| {
                IngestError::io(source.unwrap_or_else(|| Path::new("<input>")), e)
            })?;
            let decoded = String::from_utf8_lossy(&raw);
            let line = decoded.trim();

            if line.is_empty() || is_comment(line) {
                continue;
            }

            let fields = split_fields(line);

            if let Some(metadata) = parse_metadata(&fields) {
                match metadata {
                    Ok(metadata) => {
                        debug!("{}: line {} sets {:?}", label, line_number, metadata);
                        metadata.apply(&mut measurement);
                    }
                    Err(reason) => {
                        return Ok(abandon(measurement, &label, line_number, line, reason));
                    }
                }
                continue;
            }

            if !starts_numeric(line) {
                debug!("{}: skipping line {}", label, line_number);
                continue;
            }

            match parse_pair(&fields) {
                Ok((x, y)) => measurement.push(x, y),
                Err(reason) => {
                    return Ok(abandon(measurement, &label, line_number, line, reason));
                }
            }
        }

        measurement.mark_complete();
        debug!("{}: read {} points", label, measurement.len());
        Ok(measurement)
    }
}

fn abandon(
    mut measurement: Measurement,
    label: &str,
    line_number: usize,
    line: &str,
    reason: String,
) -> Measurement {
    warn!("Error parsing line {} of {}: {} [{}]", line_number, label, reason, line);
    measurement.reject(RowError {
        line: line_number,
        content: line.to_string(),
        reason,
    });
    measurement
}
