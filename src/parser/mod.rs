//! Measurement parser for CSV files and the stdin streaming protocol
//!
//! Both dialects share the same line rules:
//! - blank lines and lines starting with `#`, `/` or `'` are ignored
//! - `pixels` / `pixel count`, `max_results` and `min_confidence` lines
//!   update the request instead of adding a point
//! - data rows are `x, y[, ...]` and must start with a digit or `-`
//!
//! They differ in what ends a measurement and in how hard a bad line fails:
//! - [`file`] reads to end of input and abandons the file on a bad row
//! - [`stream`] reads one request at a time and fails the session on a bad line

pub mod file;
pub mod line;
pub mod stream;

#[cfg(test)]
pub mod tests;

pub use file::FileParser;
pub use line::Metadata;
pub use stream::StreamParser;
