//! Shared fixtures for parser tests

use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

use crate::models::MeasurementDefaults;
use crate::parser::StreamParser;


/// Helper to create a temporary file with content
pub fn create_temp_file(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Stream parser over an in-memory transcript
pub fn stream_parser(input: &str) -> StreamParser<Cursor<Vec<u8>>> {
    StreamParser::new(
        Cursor::new(input.as_bytes().to_vec()),
        MeasurementDefaults::default(),
    )
}

/// A spectrum in the layout exported by acquisition software
pub fn create_test_spectrum_csv() -> String {
    r#"# Exported spectrum
// model,WP-785
'acetaminophen sample
Wavenumber,Intensity
200.5,1021.0
201.7,1033.5
202.9,1050.25
204.1,998.0
"#
    .to_string()
}
