//! Stream-mode parsing: successive requests read from one persistent input
//!
//! A request is either count-bounded (ends after `pixels` data rows) or,
//! when its first line is `REQUEST_START`, marker-bounded (ends at
//! `REQUEST_END`). A line starting with `QUIT` ends the whole stream.
//! Malformed lines fail the session with a protocol error.

use std::io::BufRead;
use tracing::{debug, info, trace};

use super::line::{is_comment, parse_metadata, parse_pair, split_fields, starts_numeric};
use crate::constants::{QUIT, REQUEST_END, REQUEST_START};
use crate::error::{IngestError, Result};
use crate::models::{Measurement, MeasurementDefaults, ParseBound};

#[derive(Debug)]
pub struct StreamParser<R> {
    reader: R,
    defaults: MeasurementDefaults,
    buffer: Vec<u8>,
    line_number: usize,
    sessions: usize,
}

impl<R: BufRead> StreamParser<R> {
    pub fn new(reader: R, defaults: MeasurementDefaults) -> Self {
        Self {
            reader,
            defaults,
            buffer: Vec::new(),
            line_number: 0,
            sessions: 0,
        }
    }

    /// Lines consumed from the stream so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Sessions started so far, including one ended by `QUIT`
    pub fn sessions(&self) -> usize {
        self.sessions
    }

    /// Read the next request from the stream.
    ///
    /// Returns `Ok(None)` once the stream is exhausted without starting a new
    /// session. A measurement cut short by end of stream is still returned;
    /// its [`Measurement::is_complete`] is false.
    pub fn next_measurement(&mut self) -> Result<Option<Measurement>> {
        let mut measurement = Measurement::new(ParseBound::PixelCount, &self.defaults);
        let mut session_started = false;

        loop {
            self.buffer.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buffer)
                .map_err(|e| IngestError::io("<stdin>", e))?;
            if read == 0 {
                break;
            }
            self.line_number += 1;

            let decoded = String::from_utf8_lossy(&self.buffer);
            let line = decoded.trim();
            trace!("stream line {}: [{}]", self.line_number, line);

            if line.is_empty() {
                continue;
            }

            let first_line = !session_started;
            if first_line {
                session_started = true;
                self.sessions += 1;
            }

            if line.starts_with(QUIT) {
                info!("Received {} at stream line {}", QUIT, self.line_number);
                return Ok(Some(Measurement::termination(&self.defaults)));
            }

            if first_line && line == REQUEST_START {
                debug!("Session {} is marker-bounded", self.sessions);
                measurement.set_bound(ParseBound::Marker);
                continue;
            }

            if measurement.bound() == ParseBound::Marker && line == REQUEST_END {
                measurement.mark_complete();
                debug!(
                    "Session {} ended by {} after {} points",
                    self.sessions,
                    REQUEST_END,
                    measurement.len()
                );
                return Ok(Some(measurement));
            }

            if is_comment(line) {
                continue;
            }

            let fields = split_fields(line);

            if let Some(metadata) = parse_metadata(&fields) {
                let metadata = metadata
                    .map_err(|reason| IngestError::protocol(self.line_number, line, reason))?;
                debug!("Session {} sets {:?}", self.sessions, metadata);
                metadata.apply(&mut measurement);

                if measurement.bound() == ParseBound::PixelCount && !measurement.is_empty() {
                    if measurement.len() > measurement.pixels {
                        return Err(IngestError::protocol(
                            self.line_number,
                            line,
                            format!(
                                "pixel count {} is below the {} rows already read",
                                measurement.pixels,
                                measurement.len()
                            ),
                        ));
                    }
                    if measurement.len() == measurement.pixels {
                        return Ok(Some(measurement));
                    }
                }
                continue;
            }

            if fields.len() < 2 {
                return Err(IngestError::protocol(
                    self.line_number,
                    line,
                    "expected an x,y pair or a metadata field",
                ));
            }

            if !starts_numeric(line) {
                debug!("Skipping non-numeric stream line {}", self.line_number);
                continue;
            }

            let (x, y) = parse_pair(&fields)
                .map_err(|reason| IngestError::protocol(self.line_number, line, reason))?;
            measurement.push(x, y);

            if measurement.bound() == ParseBound::PixelCount
                && measurement.len() == measurement.pixels
            {
                debug!(
                    "Session {} read expected {} pixels",
                    self.sessions, measurement.pixels
                );
                return Ok(Some(measurement));
            }
        }

        if !session_started {
            return Ok(None);
        }

        info!(
            "Stream ended during session {} after {} points",
            self.sessions,
            measurement.len()
        );
        Ok(Some(measurement))
    }
}
