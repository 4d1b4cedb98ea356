//! Spectral-matching engine capability
//!
//! The engine is an external collaborator reached through [`Matcher`]. Each
//! measurement gets its own handle: open, search once, close. [`run_search`]
//! owns that lifecycle so a handle is closed on every exit path.

pub mod command;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::Measurement;

pub use command::CommandMatcher;

/// Opaque search handle issued by [`Matcher::open`]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SearchHandle(u64);

impl SearchHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Spectroscopic technique the library search is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Technique {
    Raman,
    Infrared,
    NearInfrared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum XUnit {
    Wavenumbers,
    Nanometers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum YUnit {
    ArbitraryIntensity,
    Absorbance,
    Transmittance,
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Technique::Raman => "raman",
            Technique::Infrared => "infrared",
            Technique::NearInfrared => "near-infrared",
        })
    }
}

impl fmt::Display for XUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            XUnit::Wavenumbers => "wavenumbers",
            XUnit::Nanometers => "nanometers",
        })
    }
}

impl fmt::Display for YUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YUnit::ArbitraryIntensity => "arbitrary-intensity",
            YUnit::Absorbance => "absorbance",
            YUnit::Transmittance => "transmittance",
        })
    }
}

/// One search submission
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest<'a> {
    pub technique: Technique,
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub x_unit: XUnit,
    pub y_unit: YUnit,
    pub max_results: usize,
}

impl SearchRequest<'_> {
    /// Number of points
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// One candidate identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub name: String,
    pub confidence_percent: f64,
    pub is_license_expired: bool,
}

/// Settings applied to every search of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub technique: Technique,
    pub x_unit: XUnit,
    pub y_unit: YUnit,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            technique: Technique::Raman,
            x_unit: XUnit::Wavenumbers,
            y_unit: YUnit::ArbitraryIntensity,
        }
    }
}

/// External spectral-matching engine
pub trait Matcher {
    fn open(&mut self) -> Result<SearchHandle>;

    fn search(&mut self, handle: &SearchHandle, request: &SearchRequest<'_>) -> Result<Vec<Match>>;

    fn close(&mut self, handle: SearchHandle) -> Result<()>;
}

/// Matches returned for one measurement
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub matches: Vec<Match>,
    pub elapsed: Duration,
}

/// Open a handle, search once, and close the handle whatever the search did.
///
/// A search error takes precedence over a close error; a failed close after a
/// successful search is reported as the result.
pub fn run_search(
    matcher: &mut dyn Matcher,
    settings: &SearchSettings,
    measurement: &Measurement,
) -> Result<SearchOutcome> {
    let handle = matcher.open()?;
    debug!(
        "Opening search with {} datapoints (handle {})",
        measurement.len(),
        handle.id()
    );

    let request = SearchRequest {
        technique: settings.technique,
        x: &measurement.x,
        y: &measurement.y,
        x_unit: settings.x_unit,
        y_unit: settings.y_unit,
        max_results: measurement.max_results,
    };

    let start = Instant::now();
    let searched = matcher.search(&handle, &request);
    let elapsed = start.elapsed();
    let closed = matcher.close(handle);

    match (searched, closed) {
        (Ok(mut matches), Ok(())) => {
            matches.truncate(measurement.max_results);
            Ok(SearchOutcome { matches, elapsed })
        }
        (Ok(_), Err(close_error)) => Err(close_error),
        (Err(search_error), closed) => {
            if let Err(close_error) = closed {
                warn!("Also failed to close search handle: {}", close_error);
            }
            Err(search_error)
        }
    }
}
