//! Scoring batch results against sample names taken from file names
//!
//! Reference spectra are conventionally saved as `<sample>-<NN>.csv`. The
//! sample name is compared with each reported compound to find where, if
//! anywhere, the engine ranked the right answer.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::MatchReport;
use crate::constants::SAMPLE_NAME_PATTERN;
use crate::error::{IngestError, Result};

/// Outcome for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRow {
    pub source: String,
    pub sample: String,
    /// Zero-based rank of the first equivalent match
    pub match_position: Option<usize>,
    pub confidence_percent: Option<f64>,
    /// The engine's top-ranked compound
    pub reported: Option<String>,
}

impl EvaluationRow {
    pub fn matched(&self) -> bool {
        self.match_position.is_some()
    }

    pub fn top_match(&self) -> bool {
        self.match_position == Some(0)
    }
}

#[derive(Debug, Default, Clone)]
struct Tally {
    count: usize,
    seconds: f64,
    matches: usize,
    tops: usize,
    positions: usize,
    confidence: f64,
    distractors: HashMap<String, usize>,
}

/// Aggregate performance for one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleTotals {
    pub sample: String,
    pub count: usize,
    pub avg_seconds: f64,
    /// Fraction of files where the sample appeared anywhere in the matches
    pub matched_ratio: f64,
    /// Average confidence of the correct match, over matched files
    pub avg_confidence: f64,
    pub top_match_ratio: f64,
    /// Average rank of the correct match, over matched files
    pub avg_position: f64,
    pub top_distractor: Option<String>,
}

#[derive(Debug)]
pub struct Evaluator {
    sample_pattern: Regex,
    synonyms: Vec<Vec<String>>,
    totals: BTreeMap<String, Tally>,
}

impl Evaluator {
    pub fn new(synonyms: Vec<Vec<String>>) -> Result<Self> {
        let sample_pattern = Regex::new(SAMPLE_NAME_PATTERN)
            .map_err(|e| IngestError::configuration(format!("bad sample pattern: {}", e)))?;
        Ok(Self {
            sample_pattern,
            synonyms,
            totals: BTreeMap::new(),
        })
    }

    /// `acetaminophen-03.csv` -> `acetaminophen`
    pub fn sample_name(&self, source: &str) -> Option<String> {
        self.sample_pattern
            .captures(source)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Whether a sample and a compound name refer to the same substance
    pub fn equivalent(&self, sample: &str, compound: &str) -> bool {
        if similar(sample, compound) {
            return true;
        }

        self.synonyms.iter().any(|group| {
            group.iter().enumerate().any(|(i, a)| {
                group
                    .iter()
                    .enumerate()
                    .any(|(j, b)| i != j && similar(a, sample) && similar(b, compound))
            })
        })
    }

    /// Score one report; files without a recognisable sample name are skipped
    pub fn record(&mut self, report: &MatchReport) -> Option<EvaluationRow> {
        let Some(sample) = self.sample_name(&report.source) else {
            debug!("No sample name in {}", report.source);
            return None;
        };

        let hit = report
            .matches
            .iter()
            .enumerate()
            .find(|(_, m)| self.equivalent(&sample, &m.name));

        let row = EvaluationRow {
            source: report.source.clone(),
            sample: sample.clone(),
            match_position: hit.map(|(position, _)| position),
            confidence_percent: hit.map(|(_, m)| m.confidence_percent),
            reported: report.matches.first().map(|m| m.name.clone()),
        };

        let tally = self.totals.entry(sample).or_default();
        tally.count += 1;
        tally.seconds += report.elapsed_sec;
        match (row.match_position, row.confidence_percent) {
            (Some(position), Some(confidence)) => {
                tally.matches += 1;
                tally.positions += position;
                tally.confidence += confidence;
                if position == 0 {
                    tally.tops += 1;
                }
            }
            _ => {
                let distractor = row.reported.clone().unwrap_or_else(|| "(none)".to_string());
                *tally.distractors.entry(distractor).or_default() += 1;
            }
        }

        Some(row)
    }

    /// Per-sample aggregates, ordered by sample name
    pub fn totals(&self) -> Vec<SampleTotals> {
        self.totals
            .iter()
            .map(|(sample, tally)| {
                let count = tally.count.max(1) as f64;
                let matched = tally.matches.max(1) as f64;
                let top_distractor = tally
                    .distractors
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(name, _)| name.clone());

                SampleTotals {
                    sample: sample.clone(),
                    count: tally.count,
                    avg_seconds: tally.seconds / count,
                    matched_ratio: tally.matches as f64 / count,
                    avg_confidence: tally.confidence / matched,
                    top_match_ratio: tally.tops as f64 / count,
                    avg_position: tally.positions as f64 / matched,
                    top_distractor,
                }
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Either name contains the other, ignoring spaces and case
fn similar(a: &str, b: &str) -> bool {
    let a: String = a.chars().filter(|c| *c != ' ').collect::<String>().to_lowercase();
    let b: String = b.chars().filter(|c| *c != ' ').collect::<String>().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_SYNONYMS;
    use crate::matcher::Match;

    fn evaluator() -> Evaluator {
        Evaluator::new(
            DEFAULT_SYNONYMS
                .iter()
                .map(|g| g.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn report(source: &str, names: &[(&str, f64)], seconds: f64) -> MatchReport {
        MatchReport {
            source: source.to_string(),
            points: 1024,
            valid: true,
            searched: true,
            elapsed_sec: seconds,
            matches: names
                .iter()
                .map(|(name, confidence)| Match {
                    name: name.to_string(),
                    confidence_percent: *confidence,
                    is_license_expired: false,
                })
                .collect(),
            filtered_out: 0,
        }
    }

    #[test]
    fn test_sample_name_from_path() {
        let e = evaluator();
        assert_eq!(
            e.sample_name("/data/spectra/Acetaminophen-03.csv"),
            Some("Acetaminophen".to_string())
        );
        assert_eq!(
            e.sample_name(r"C:\spectra\MEK-12.csv"),
            Some("MEK".to_string())
        );
        assert_eq!(e.sample_name("/data/blank.csv"), None);
    }

    #[test]
    fn test_similar_ignores_case_and_spaces() {
        assert!(similar("isopropyl alcohol", "IsopropylAlcohol"));
        assert!(similar("Cyclo", "cyclohexane"));
        assert!(!similar("benzene", "toluene"));
    }

    #[test]
    fn test_blank_name_is_never_similar() {
        assert!(!similar("", "Acetone"));
        assert!(!similar("MEK", "  "));
        assert!(!similar("", ""));

        let mut e = evaluator();
        let row = e
            .record(&report("/d/MEK-01.csv", &[("", 90.0), ("Acetone", 80.0)], 1.0))
            .unwrap();
        assert_eq!(row.match_position, None);
        assert!(!row.matched());
    }

    #[test]
    fn test_synonyms() {
        let e = evaluator();
        assert!(e.equivalent("MEK", "2-Butanone"));
        assert!(e.equivalent("Acetaminophen", "4-Acetamidophenol"));
        assert!(!e.equivalent("MEK", "Acetone"));
    }

    #[test]
    fn test_record_finds_position() {
        let mut e = evaluator();
        let row = e
            .record(&report(
                "/d/MEK-01.csv",
                &[("Acetone", 80.0), ("2-Butanone", 75.0)],
                2.0,
            ))
            .unwrap();

        assert_eq!(row.match_position, Some(1));
        assert_eq!(row.confidence_percent, Some(75.0));
        assert_eq!(row.reported.as_deref(), Some("Acetone"));
        assert!(row.matched());
        assert!(!row.top_match());
    }

    #[test]
    fn test_totals() {
        let mut e = evaluator();
        e.record(&report("/d/MEK-01.csv", &[("2-Butanone", 90.0)], 1.0));
        e.record(&report("/d/MEK-02.csv", &[("Acetone", 70.0)], 3.0));
        e.record(&report("/d/MEK-03.csv", &[("Acetone", 65.0)], 2.0));
        e.record(&report("/d/Toluene-01.csv", &[], 1.0));
        assert!(e.record(&report("/d/unnamed.csv", &[], 1.0)).is_none());

        let totals = e.totals();
        assert_eq!(totals.len(), 2);

        let mek = &totals[0];
        assert_eq!(mek.sample, "MEK");
        assert_eq!(mek.count, 3);
        assert!((mek.avg_seconds - 2.0).abs() < 1e-9);
        assert!((mek.matched_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert!((mek.avg_confidence - 90.0).abs() < 1e-9);
        assert!((mek.top_match_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(mek.top_distractor.as_deref(), Some("Acetone"));

        let toluene = &totals[1];
        assert_eq!(toluene.top_distractor.as_deref(), Some("(none)"));
        assert_eq!(toluene.matched_ratio, 0.0);
    }
}
