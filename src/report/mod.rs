//! Result reporting
//!
//! Every measurement produces one [`MatchReport`], written to the configured
//! sink as human-readable text, JSON lines or CSV rows. Logs go to stderr, so
//! the sink is normally stdout and stays machine-readable.

pub mod evaluation;

use chrono::{DateTime, Local};
use colored::*;
use indicatif::HumanDuration;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use crate::config::OutputFormat;
use crate::error::{IngestError, Result};
use crate::matcher::{Match, SearchOutcome};
use crate::models::Measurement;

pub use evaluation::{EvaluationRow, Evaluator, SampleTotals};

/// Outcome of one measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    /// File path, or `stream session N`
    pub source: String,
    pub points: usize,
    pub valid: bool,
    /// False for dry runs and skipped measurements
    pub searched: bool,
    pub elapsed_sec: f64,
    /// Matches at or above the measurement's minimum confidence, best first
    pub matches: Vec<Match>,
    /// Matches the engine returned below the minimum confidence
    pub filtered_out: usize,
}

impl MatchReport {
    /// Report for a completed search
    pub fn searched(source: impl Into<String>, measurement: &Measurement, outcome: SearchOutcome) -> Self {
        let threshold = measurement.min_confidence * 100.0;
        let returned = outcome.matches.len();
        let matches: Vec<Match> = outcome
            .matches
            .into_iter()
            .filter(|m| m.confidence_percent >= threshold)
            .collect();

        Self {
            source: source.into(),
            points: measurement.len(),
            valid: measurement.is_valid(),
            searched: true,
            elapsed_sec: outcome.elapsed.as_secs_f64(),
            filtered_out: returned - matches.len(),
            matches,
        }
    }

    /// Report for a measurement that was parsed but not searched
    pub fn unsearched(source: impl Into<String>, measurement: &Measurement) -> Self {
        Self {
            source: source.into(),
            points: measurement.len(),
            valid: measurement.is_valid(),
            searched: false,
            elapsed_sec: 0.0,
            matches: Vec::new(),
            filtered_out: 0,
        }
    }

    pub fn best(&self) -> Option<&Match> {
        self.matches.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Batch,
    Stream,
}

/// Totals for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub started_at: DateTime<Local>,
    pub files_discovered: usize,
    pub measurements_parsed: usize,
    pub invalid: usize,
    pub searched: usize,
    /// Searches that reported at least one match
    pub matched: usize,
    pub matcher_failures: usize,
    pub sessions: usize,
    pub terminated_by_quit: bool,
    pub processing_time_ms: u128,
}

impl RunSummary {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            started_at: Local::now(),
            files_discovered: 0,
            measurements_parsed: 0,
            invalid: 0,
            searched: 0,
            matched: 0,
            matcher_failures: 0,
            sessions: 0,
            terminated_by_quit: false,
            processing_time_ms: 0,
        }
    }

    pub fn processing_time(&self) -> Duration {
        Duration::from_millis(self.processing_time_ms as u64)
    }
}

/// Flat CSV row; matches are joined as `name:confidence` pairs
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    source: &'a str,
    points: usize,
    valid: bool,
    searched: bool,
    elapsed_sec: f64,
    match_count: usize,
    best_match: Option<&'a str>,
    best_confidence: Option<f64>,
    matches: String,
}

/// Writes reports in one output format
pub struct Reporter<W: Write> {
    format: OutputFormat,
    out: W,
    /// CSV header already emitted for the per-measurement rows
    header_written: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            format,
            out,
            header_written: false,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn report(&mut self, report: &MatchReport) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, report)?;
                writeln!(self.out).map_err(IngestError::report)?;
            }
            OutputFormat::Human => {
                write_human_report(&mut self.out, report).map_err(IngestError::report)?
            }
            OutputFormat::Csv => {
                let matches = report
                    .matches
                    .iter()
                    .map(|m| format!("{}:{:.2}", m.name, m.confidence_percent))
                    .collect::<Vec<_>>()
                    .join(";");

                let mut writer = csv::WriterBuilder::new()
                    .has_headers(!self.header_written)
                    .from_writer(&mut self.out);
                writer.serialize(CsvRow {
                    source: &report.source,
                    points: report.points,
                    valid: report.valid,
                    searched: report.searched,
                    elapsed_sec: report.elapsed_sec,
                    match_count: report.matches.len(),
                    best_match: report.best().map(|m| m.name.as_str()),
                    best_confidence: report.best().map(|m| m.confidence_percent),
                    matches,
                })?;
                writer.flush().map_err(IngestError::report)?;
                self.header_written = true;
            }
        }
        self.flush()
    }

    /// Final totals. CSV output carries rows only, so the summary is left to the log.
    pub fn summary(&mut self, summary: &RunSummary) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({ "summary": summary });
                serde_json::to_writer(&mut self.out, &value)?;
                writeln!(self.out).map_err(IngestError::report)?;
            }
            OutputFormat::Human => {
                write_human_summary(&mut self.out, summary).map_err(IngestError::report)?
            }
            OutputFormat::Csv => {}
        }
        self.flush()
    }

    /// Per-sample evaluation totals
    pub fn evaluation(&mut self, totals: &[SampleTotals]) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({ "evaluation": totals });
                serde_json::to_writer(&mut self.out, &value)?;
                writeln!(self.out).map_err(IngestError::report)?;
            }
            OutputFormat::Human => {
                write_human_evaluation(&mut self.out, totals).map_err(IngestError::report)?
            }
            OutputFormat::Csv => {
                // Second table, separated from the per-file rows by a blank line
                if self.header_written {
                    writeln!(self.out).map_err(IngestError::report)?;
                }
                let mut writer = csv::Writer::from_writer(&mut self.out);
                writer.write_record([
                    "Totals",
                    "Count",
                    "Avg Seconds",
                    "Matched",
                    "Avg Confidence",
                    "Top Match",
                    "Avg Position",
                    "Top Distractor",
                ])?;
                for total in totals {
                    writer.write_record([
                        total.sample.clone(),
                        total.count.to_string(),
                        format!("{:.3}", total.avg_seconds),
                        format!("{:.3}", total.matched_ratio),
                        format!("{:.2}", total.avg_confidence),
                        format!("{:.3}", total.top_match_ratio),
                        format!("{:.2}", total.avg_position),
                        total.top_distractor.clone().unwrap_or_default(),
                    ])?;
                }
                writer.flush().map_err(IngestError::report)?;
            }
        }
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(IngestError::report)
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.out)
    }
}

fn write_human_report<W: Write>(out: &mut W, report: &MatchReport) -> std::io::Result<()> {
    writeln!(out, "{} ({} points)", report.source.bold(), report.points)?;

    if !report.searched {
        let status = if report.valid {
            "valid, not searched".green()
        } else {
            "invalid, not searched".yellow()
        };
        return writeln!(out, "   {}", status);
    }

    writeln!(
        out,
        "   {} matches found in {:.2} sec",
        report.matches.len(),
        report.elapsed_sec
    )?;
    for (i, m) in report.matches.iter().enumerate() {
        write!(
            out,
            "   Match {:02}: {} ({} confidence)",
            i + 1,
            m.name,
            format!("{:.2}%", m.confidence_percent).green()
        )?;
        if m.is_license_expired {
            write!(out, " {}", "[license expired]".yellow())?;
        }
        writeln!(out)?;
    }
    if report.filtered_out > 0 {
        writeln!(
            out,
            "   {} below minimum confidence",
            report.filtered_out.to_string().dimmed()
        )?;
    }
    Ok(())
}

fn write_human_summary<W: Write>(out: &mut W, summary: &RunSummary) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "Spectral ingestion complete".bold().green())?;
    writeln!(out, "{}", "━".repeat(40))?;
    writeln!(
        out,
        "   • Started: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    match summary.mode {
        RunMode::Batch => writeln!(out, "   • Files discovered: {}", summary.files_discovered)?,
        RunMode::Stream => writeln!(out, "   • Sessions: {}", summary.sessions)?,
    }
    writeln!(out, "   • Measurements parsed: {}", summary.measurements_parsed)?;
    writeln!(out, "   • Searched: {}", summary.searched)?;
    writeln!(out, "   • With matches: {}", summary.matched)?;
    if summary.invalid > 0 {
        writeln!(
            out,
            "   • Invalid: {}",
            summary.invalid.to_string().yellow()
        )?;
    }
    if summary.matcher_failures > 0 {
        writeln!(
            out,
            "   • Matcher failures: {}",
            summary.matcher_failures.to_string().red()
        )?;
    }
    if summary.terminated_by_quit {
        writeln!(out, "   • Stopped by QUIT")?;
    }
    writeln!(
        out,
        "   • Processing time: {}",
        HumanDuration(summary.processing_time())
    )?;
    writeln!(out)
}

fn write_human_evaluation<W: Write>(out: &mut W, totals: &[SampleTotals]) -> std::io::Result<()> {
    writeln!(out, "{}", "Evaluation".bold())?;
    writeln!(
        out,
        "{:<24} {:>5} {:>8} {:>8} {:>9} {:>8} {:>8}  {}",
        "Sample", "Count", "Avg sec", "Matched", "Avg conf", "Top", "Avg pos", "Top distractor"
    )?;
    for total in totals {
        writeln!(
            out,
            "{:<24} {:>5} {:>8.3} {:>7.1}% {:>8.2}% {:>7.1}% {:>8.2}  {}",
            total.sample,
            total.count,
            total.avg_seconds,
            total.matched_ratio * 100.0,
            total.avg_confidence,
            total.top_match_ratio * 100.0,
            total.avg_position,
            total.top_distractor.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}
