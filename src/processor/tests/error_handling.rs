//! Failure scoping: which errors skip a measurement and which end the run

use super::*;
use crate::processor::Pipeline;
use std::io::Cursor;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[test]
fn test_protocol_error_halts_stream() {
    let mut matcher = RecordingMatcher::default();
    let config = test_config();
    let result = {
        let mut pipeline = Pipeline::new(Some(&mut matcher), &config, Vec::new()).unwrap();
        pipeline.run_stream(Cursor::new(
            b"pixels,2\n1,10\n2,20\ngarbage\n1,10\n2,20\n".to_vec(),
        ))
    };

    match result {
        Err(IngestError::Protocol { content, .. }) => assert_eq!(content, "garbage"),
        other => panic!("Expected Protocol error, got {:?}", other.map(|s| s.sessions)),
    }
    // the session before the bad line was searched, nothing after it
    assert_eq!(matcher.searches, vec![2]);
}

#[test]
fn test_matcher_open_failure_skips_measurement() {
    let temp_dir = TempDir::new().unwrap();
    write_spectrum(temp_dir.path(), "a-01.csv", "1,10\n2,20\n");
    write_spectrum(temp_dir.path(), "b-01.csv", "1,10\n2,20\n");

    let mut matcher = RecordingMatcher {
        fail_open: true,
        ..Default::default()
    };
    let config = test_config();
    let summary = {
        let mut pipeline = Pipeline::new(Some(&mut matcher), &config, Vec::new()).unwrap();
        pipeline.run_batch(temp_dir.path(), "*.csv").unwrap()
    };

    assert_eq!(summary.matcher_failures, 2);
    assert_eq!(summary.searched, 0);
    assert_eq!(matcher.closes, 0);
}

#[test]
fn test_search_failure_closes_handle_and_continues() {
    let mut matcher = RecordingMatcher {
        fail_search_on: Some(1),
        ..Default::default()
    };
    let config = test_config();
    let summary = {
        let mut pipeline = Pipeline::new(Some(&mut matcher), &config, Vec::new()).unwrap();
        pipeline
            .run_stream(Cursor::new(b"pixels,2\n1,1\n2,2\npixels,2\n3,3\n4,4\n".to_vec()))
            .unwrap()
    };

    assert_eq!(summary.matcher_failures, 1);
    assert_eq!(summary.searched, 1);
    assert_eq!(matcher.opens, 2);
    assert_eq!(matcher.closes, 2);
    assert!(matcher.open_handles.is_empty());
}

#[test]
fn test_cancelled_batch_is_interrupted() {
    let temp_dir = TempDir::new().unwrap();
    write_spectrum(temp_dir.path(), "a-01.csv", "1,10\n2,20\n");

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut matcher = RecordingMatcher::default();
    let config = test_config();
    let result = {
        let mut pipeline = Pipeline::new(Some(&mut matcher), &config, Vec::new())
            .unwrap()
            .with_cancellation(cancel);
        pipeline.run_batch(temp_dir.path(), "*.csv")
    };

    assert!(matches!(result, Err(IngestError::Interrupted { .. })));
    assert_eq!(matcher.opens, 0);
}

#[test]
fn test_invalid_mask_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut matcher = RecordingMatcher::default();
    let config = test_config();
    let mut pipeline = Pipeline::new(Some(&mut matcher), &config, Vec::new()).unwrap();

    assert!(matches!(
        pipeline.run_batch(temp_dir.path(), "[a-"),
        Err(IngestError::Configuration { .. })
    ));
}

#[test]
fn test_missing_matcher_requires_dry_run() {
    let mut config = test_config();

    let result = Pipeline::new(None, &config, Vec::new());
    assert!(matches!(result, Err(IngestError::Configuration { .. })));

    config.dry_run = true;
    let pipeline = Pipeline::new(None, &config, Vec::new()).unwrap();
    assert!(pipeline.is_dry_run());
}
