//! Run progress reporting.
//!
//! Extraction and discovery are slow by design (every request waits out the
//! rate limit), so the operator sees which keyword or docket is in flight.
//! Progress goes to **stderr** so stdout stays reserved for the summary.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Running a keyword search.
    Searching { keyword: String },
    /// Visiting docket `n` of `total`.
    Visiting { docket: String, n: u64, total: u64 },
    /// A document was downloaded; `n` new documents so far out of `target`.
    Downloaded { file: String, n: u64, target: u64 },
}

/// Receives progress events from the extraction and discovery loops.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly lines: `[  3/120] docket 12345-21`.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Searching { keyword } => {
                format!("searching  '{}'\n", keyword)
            }
            ProgressEvent::Visiting { docket, n, total } => {
                format!("{} docket {}\n", counter(*n, *total), docket)
            }
            ProgressEvent::Downloaded { file, n, target } => {
                format!("  downloaded {}  ({} / {})\n", file, n, target)
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Searching { keyword } => serde_json::json!({
                "event": "progress",
                "phase": "searching",
                "keyword": keyword
            }),
            ProgressEvent::Visiting { docket, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "visiting",
                "docket": docket,
                "n": n,
                "total": total
            }),
            ProgressEvent::Downloaded { file, n, target } => serde_json::json!({
                "event": "progress",
                "phase": "downloaded",
                "file": file,
                "n": n,
                "target": target
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// Discards every event. Used by `--progress off` and by tests.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// `[  7/120]`: `n` right-aligned to the width of `total` so lines stay
/// aligned for the whole run.
fn counter(n: u64, total: u64) -> String {
    let width = total.to_string().len();
    format!("[{:>width$}/{}]", n, total, width = width)
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// `human` when stderr is an interactive terminal; `off` when it is piped
    /// or redirected (cron jobs, CI logs).
    pub fn auto() -> Self {
        match atty::is(atty::Stream::Stderr) {
            true => ProgressMode::Human,
            false => ProgressMode::Off,
        }
    }

    pub fn into_reporter(self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
            ProgressMode::Off => Box::new(NoProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_pads_to_total_width() {
        assert_eq!(counter(7, 120), "[  7/120]");
        assert_eq!(counter(120, 120), "[120/120]");
        assert_eq!(counter(1, 0), "[1/0]");
    }

    #[test]
    fn off_mode_builds_silent_reporter() {
        let reporter = ProgressMode::Off.into_reporter();
        reporter.report(ProgressEvent::Searching {
            keyword: "order".into(),
        });
    }
}
