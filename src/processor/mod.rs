//! Processing pipeline
//!
//! Drives measurements from either a directory tree (batch mode) or one
//! persistent input stream (streaming mode) through the matcher, one at a
//! time. Failures are scoped to a file or a session: a bad file is skipped,
//! a broken stream ends the run.

pub mod discovery;

#[cfg(test)]
pub mod tests;

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use self::discovery::DiscoveredFileSet;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::matcher::{Matcher, SearchSettings, run_search};
use crate::models::{Measurement, MeasurementDefaults};
use crate::parser::{FileParser, StreamParser};
use crate::report::{Evaluator, MatchReport, Reporter, RunMode, RunSummary};

/// Sequential measurement pipeline bound to one matcher and one report sink
pub struct Pipeline<'m, W: Write> {
    /// `None` runs dry: measurements are parsed and reported, never searched
    matcher: Option<&'m mut dyn Matcher>,
    settings: SearchSettings,
    defaults: MeasurementDefaults,
    reporter: Reporter<W>,
    evaluator: Option<Evaluator>,
    cancel: CancellationToken,
    show_progress: bool,
}

impl<'m, W: Write> Pipeline<'m, W> {
    pub fn new(matcher: Option<&'m mut dyn Matcher>, config: &IngestConfig, out: W) -> Result<Self> {
        let matcher = match (matcher, config.dry_run) {
            (_, true) => None,
            (Some(matcher), false) => Some(matcher),
            (None, false) => {
                return Err(IngestError::configuration(
                    "no matcher bound; pass one or enable dry_run",
                ));
            }
        };
        let evaluator = if config.evaluate {
            Some(Evaluator::new(config.synonyms.clone())?)
        } else {
            None
        };

        Ok(Self {
            matcher,
            settings: config.matcher.search,
            defaults: config.defaults,
            reporter: Reporter::new(out, config.output_format),
            evaluator,
            cancel: CancellationToken::new(),
            show_progress: false,
        })
    }

    /// Token checked between measurements
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.matcher.is_none()
    }

    /// Parse and search every file under `root` matching `mask`, in sorted order
    pub fn run_batch(&mut self, root: &Path, mask: &str) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary::new(RunMode::Batch);

        let files = DiscoveredFileSet::discover(root, mask)?;
        summary.files_discovered = files.len();
        if files.is_empty() {
            warn!("No files matching {} under {}", mask, root.display());
        } else {
            info!("Processing {} files under {}", files.len(), root.display());
        }

        let progress = self.progress_bar(files.len() as u64);
        let parser = FileParser::new(self.defaults);

        for path in &files {
            if self.cancel.is_cancelled() {
                progress.abandon_with_message("Cancelled");
                return Err(IngestError::interrupted("cancelled during batch run"));
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            progress.set_message(name);

            self.process_file(&parser, path, &mut summary)?;
            progress.inc(1);
        }
        progress.finish_and_clear();

        if let Some(evaluator) = &self.evaluator {
            if !evaluator.is_empty() {
                self.reporter.evaluation(&evaluator.totals())?;
            }
        }

        summary.processing_time_ms = start.elapsed().as_millis();
        self.reporter.summary(&summary)?;
        Ok(summary)
    }

    /// Read requests from `reader` until end of input or `QUIT`.
    ///
    /// A protocol error ends the run with that error. A session cut short by
    /// end of input is still searched if it carried any data.
    pub fn run_stream<R: BufRead>(&mut self, reader: R) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary::new(RunMode::Stream);
        let mut parser = StreamParser::new(reader, self.defaults);

        loop {
            if self.cancel.is_cancelled() {
                return Err(IngestError::interrupted("cancelled during streaming session"));
            }

            let measurement = match parser.next_measurement() {
                Ok(Some(measurement)) => measurement,
                Ok(None) => {
                    debug!("End of input after {} lines", parser.line_number());
                    break;
                }
                Err(e) => {
                    error!("Streaming session {} failed: {}", parser.sessions(), e);
                    return Err(e);
                }
            };
            summary.sessions = parser.sessions();

            if measurement.is_termination_signal {
                info!("QUIT received, stopping");
                summary.terminated_by_quit = true;
                break;
            }

            summary.measurements_parsed += 1;
            let source = format!("stream session {}", parser.sessions());

            if measurement.is_empty() {
                warn!("{} ended before any data", source);
                summary.invalid += 1;
                continue;
            }
            if !measurement.is_valid() {
                warn!(
                    "{} ended early with {} points ({:?} bound), searching anyway",
                    source,
                    measurement.len(),
                    measurement.bound()
                );
                summary.invalid += 1;
            }

            self.submit(source, &measurement, &mut summary)?;
        }

        summary.processing_time_ms = start.elapsed().as_millis();
        self.reporter.summary(&summary)?;
        Ok(summary)
    }

    /// Consume the pipeline and return the report sink
    pub fn into_output(self) -> Result<W> {
        self.reporter.into_inner()
    }

    fn process_file(
        &mut self,
        parser: &FileParser,
        path: &Path,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let measurement = match parser.parse_path(path) {
            Ok(measurement) => measurement,
            Err(e) => {
                warn!("Skipping unreadable file: {}", e);
                summary.invalid += 1;
                return Ok(());
            }
        };
        summary.measurements_parsed += 1;

        if let Some(row) = measurement.row_error() {
            let err = IngestError::RowParse {
                path: path.to_path_buf(),
                line: row.line,
                content: row.content.clone(),
                reason: row.reason.clone(),
            };
            warn!("Skipping file: {}", err);
            summary.invalid += 1;
            return Ok(());
        }

        if !measurement.is_valid() {
            warn!(
                "Skipping {}: {} data points",
                path.display(),
                measurement.len()
            );
            summary.invalid += 1;
            return Ok(());
        }

        debug!("Parsed {} points from {}", measurement.len(), path.display());
        self.submit(measurement.source_label(), &measurement, summary)
    }

    /// Search one measurement and report it. Matcher failures skip the
    /// measurement; only report write failures propagate.
    fn submit(
        &mut self,
        source: String,
        measurement: &Measurement,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let report = match self.matcher.as_deref_mut() {
            None => {
                debug!("Dry run, not searching {}", source);
                MatchReport::unsearched(source, measurement)
            }
            Some(matcher) => match run_search(matcher, &self.settings, measurement) {
                Ok(outcome) => {
                    summary.searched += 1;
                    let report = MatchReport::searched(source, measurement, outcome);
                    if !report.matches.is_empty() {
                        summary.matched += 1;
                    }
                    info!(
                        "{}: {} matches in {:.2} sec",
                        report.source,
                        report.matches.len(),
                        report.elapsed_sec
                    );
                    report
                }
                Err(e) => {
                    error!("Search failed for {}: {}", source, e);
                    summary.matcher_failures += 1;
                    return Ok(());
                }
            },
        };

        if report.searched {
            if let Some(evaluator) = self.evaluator.as_mut() {
                evaluator.record(&report);
            }
        }
        self.reporter.report(&report)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}
