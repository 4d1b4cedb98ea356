//! Command execution: logging, configuration, matcher binding and the run itself

use anyhow::Context;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::args::Args;
use crate::config::IngestConfig;
use crate::matcher::{CommandMatcher, Matcher};
use crate::processor::Pipeline;
use crate::report::RunSummary;

/// Run one batch or streaming pass with the given arguments.
///
/// Blocking; the binary runs it on a blocking task and cancels `cancel`
/// on Ctrl+C.
pub fn run(args: Args, cancel: CancellationToken) -> anyhow::Result<RunSummary> {
    setup_logging(&args);

    info!("Starting spectral-ingest");
    debug!("Command line arguments: {:?}", args);

    let config = load_configuration(&args)?;
    debug!("Loaded configuration: {:?}", config);

    let mut matcher = match (&config.matcher.engine, config.dry_run) {
        (Some(engine), false) => Some(CommandMatcher::new(
            engine.clone(),
            config.matcher.engine_args.clone(),
        )),
        _ => None,
    };
    let matcher = matcher.as_mut().map(|m| m as &mut dyn Matcher);

    let stdout = std::io::stdout().lock();
    let mut pipeline = Pipeline::new(matcher, &config, stdout)?
        .with_cancellation(cancel)
        .with_progress(args.show_progress(&config));

    let summary = if config.streaming {
        info!("Reading requests from stdin");
        pipeline
            .run_stream(std::io::stdin().lock())
            .context("streaming session failed")?
    } else {
        info!(
            "Scanning {} for {}",
            config.directory.display(),
            config.file_mask
        );
        pipeline
            .run_batch(&config.directory, &config.file_mask)
            .with_context(|| format!("batch run over {} failed", config.directory.display()))?
    };
    let mut stdout = pipeline.into_output()?;
    stdout.flush().context("failed to flush results")?;

    info!(
        "Finished: {} parsed, {} searched, {} invalid, {} matcher failures",
        summary.measurements_parsed, summary.searched, summary.invalid, summary.matcher_failures
    );
    Ok(summary)
}

/// Logs go to stderr; stdout carries results only
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("spectral_ingest={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

/// Defaults, then the config file, then the environment, then flags
fn load_configuration(args: &Args) -> anyhow::Result<IngestConfig> {
    let config = IngestConfig::load_layered(args.config_file.as_deref())
        .context("failed to load configuration")?;
    let config = args.apply_to(config);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ingest.json");
        std::fs::write(
            &path,
            r#"{ "directory": "/from/file", "matcher": { "engine": "/opt/engine" } }"#,
        )
        .unwrap();

        let args = Args::try_parse_from([
            "spectral-ingest",
            "--config",
            path.to_str().unwrap(),
            "--max-results",
            "5",
        ])
        .unwrap();
        let config = load_configuration(&args).unwrap();

        assert_eq!(config.matcher.engine, Some(PathBuf::from("/opt/engine")));
        assert_eq!(config.defaults.max_results, 5);
    }

    #[test]
    fn test_invalid_flags_fail_validation() {
        let args = Args::try_parse_from([
            "spectral-ingest",
            "--dry-run",
            "--max-results",
            "500",
        ])
        .unwrap();

        let err = load_configuration(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("max_results"));
    }
}
