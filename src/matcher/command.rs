//! Matcher backed by an external engine executable
//!
//! Each search runs the engine once:
//!
//! ```text
//! <engine> [engine args...] --technique raman --x-unit wavenumbers \
//!          --y-unit arbitrary-intensity --max-results 20
//! ```
//!
//! The spectrum is written to its stdin as `x,y` lines. Every stdout line of
//! the form `confidence,expired,name` is one match, best first; blank lines
//! and `#` lines are ignored. The name is the remainder of the line and may
//! itself contain commas.

use std::collections::HashSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, error};

use super::{Match, Matcher, SearchHandle, SearchRequest};
use crate::error::{IngestError, Result};

#[derive(Debug)]
pub struct CommandMatcher {
    engine: PathBuf,
    engine_args: Vec<String>,
    next_id: u64,
    open_handles: HashSet<u64>,
}

impl CommandMatcher {
    pub fn new(engine: impl Into<PathBuf>, engine_args: Vec<String>) -> Self {
        Self {
            engine: engine.into(),
            engine_args,
            next_id: 0,
            open_handles: HashSet::new(),
        }
    }

    pub fn engine(&self) -> &Path {
        &self.engine
    }

    fn build_command(&self, request: &SearchRequest<'_>) -> Command {
        let mut command = Command::new(&self.engine);
        command
            .args(&self.engine_args)
            .arg("--technique")
            .arg(request.technique.to_string())
            .arg("--x-unit")
            .arg(request.x_unit.to_string())
            .arg("--y-unit")
            .arg(request.y_unit.to_string())
            .arg("--max-results")
            .arg(request.max_results.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl Matcher for CommandMatcher {
    fn open(&mut self) -> Result<SearchHandle> {
        if !self.engine.exists() {
            return Err(IngestError::matcher_open(format!(
                "engine not found at {}",
                self.engine.display()
            )));
        }

        self.next_id += 1;
        self.open_handles.insert(self.next_id);
        Ok(SearchHandle::new(self.next_id))
    }

    fn search(&mut self, handle: &SearchHandle, request: &SearchRequest<'_>) -> Result<Vec<Match>> {
        if !self.open_handles.contains(&handle.id()) {
            return Err(IngestError::matcher_search(format!(
                "search handle {} is not open",
                handle.id()
            )));
        }

        let mut command = self.build_command(request);
        debug!("Executing engine: {:?}", command);

        let mut child = command.spawn().map_err(|e| {
            IngestError::matcher_search(format!(
                "failed to start {}: {}",
                self.engine.display(),
                e
            ))
        })?;

        let payload: String = request
            .x
            .iter()
            .zip(request.y)
            .map(|(x, y)| format!("{},{}\n", x, y))
            .collect();

        let stdin = child.stdin.take();
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(payload.as_bytes())?;
            }
            Ok(())
        });

        let output = child.wait_with_output().map_err(|e| {
            IngestError::matcher_search(format!("failed to wait for engine: {}", e))
        })?;

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("Engine closed stdin before reading the whole spectrum");
            }
            Ok(Err(e)) => {
                return Err(IngestError::matcher_search(format!(
                    "failed to send spectrum to engine: {}",
                    e
                )));
            }
            Err(_) => {
                return Err(IngestError::matcher_search("spectrum writer panicked"));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Engine failed with status: {}", output.status);
            return Err(IngestError::matcher_search(format!(
                "engine exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_engine_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn close(&mut self, handle: SearchHandle) -> Result<()> {
        if self.open_handles.remove(&handle.id()) {
            Ok(())
        } else {
            Err(IngestError::matcher_close(format!(
                "search handle {} is not open",
                handle.id()
            )))
        }
    }
}

/// Parse engine stdout into matches, best first
pub fn parse_engine_output(stdout: &str) -> Result<Vec<Match>> {
    let mut matches = Vec::new();

    for (index, line) in stdout.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.splitn(3, ',');
        let (Some(confidence), Some(expired), Some(name)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(IngestError::matcher_search(format!(
                "engine output line {} is not 'confidence,expired,name': {}",
                index + 1,
                line
            )));
        };

        let confidence_percent = confidence.trim().parse::<f64>().map_err(|_| {
            IngestError::matcher_search(format!(
                "engine output line {} has bad confidence '{}'",
                index + 1,
                confidence.trim()
            ))
        })?;

        let is_license_expired = match expired.trim() {
            "0" | "false" => false,
            "1" | "true" => true,
            other => {
                return Err(IngestError::matcher_search(format!(
                    "engine output line {} has bad expiry flag '{}'",
                    index + 1,
                    other
                )));
            }
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(IngestError::matcher_search(format!(
                "engine output line {} has no compound name",
                index + 1
            )));
        }

        matches.push(Match {
            name: name.to_string(),
            confidence_percent,
            is_license_expired,
        });
    }

    Ok(matches)
}
