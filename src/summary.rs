//! Run counters and end-of-run summaries.
//!
//! [`RunCounters`] is owned by whichever mode is running and handed to the
//! render functions here once the run ends. Summaries are returned as strings
//! so `main` decides where they go (stdout).

use chrono::{DateTime, Local};
use std::fmt::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Mutable tallies for one run.
#[derive(Debug, Clone)]
pub struct RunCounters {
    pub newly_downloaded: u64,
    pub skipped_existing: u64,
    pub errors: u64,
    pub api_calls: u64,
    /// Downloads this run per configured category, in filter order.
    pub per_category: Vec<(String, u64)>,
    pub started_at: DateTime<Local>,
    started: Instant,
    finished: Option<Duration>,
    /// Documents known on disk at the end of the run.
    pub library_total: usize,
    pub output_dir: Option<PathBuf>,
}

impl RunCounters {
    pub fn new(categories: &[String]) -> Self {
        Self {
            newly_downloaded: 0,
            skipped_existing: 0,
            errors: 0,
            api_calls: 0,
            per_category: categories.iter().map(|c| (c.clone(), 0)).collect(),
            started_at: Local::now(),
            started: Instant::now(),
            finished: None,
            library_total: 0,
            output_dir: None,
        }
    }

    pub fn record_download(&mut self, category: &str) {
        self.newly_downloaded += 1;
        if let Some((_, n)) = self.per_category.iter_mut().find(|(c, _)| c == category) {
            *n += 1;
        }
    }

    pub fn category_count(&self, category: &str) -> u64 {
        self.per_category
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Freeze the elapsed time.
    pub fn finish(&mut self) {
        self.finished = Some(self.started.elapsed());
    }

    pub fn elapsed(&self) -> Duration {
        self.finished.unwrap_or_else(|| self.started.elapsed())
    }
}

/// Extraction summary.
pub fn render_extraction(counters: &RunCounters) -> String {
    let mut out = String::new();
    let rule = "=".repeat(50);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "EXTRACTION COMPLETE");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "New documents downloaded: {}", counters.newly_downloaded);
    let _ = writeln!(
        out,
        "Documents skipped (already existed): {}",
        counters.skipped_existing
    );
    let _ = writeln!(out, "Total documents in library: {}", counters.library_total);

    if !counters.per_category.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Downloaded by type:");
        for (category, count) in &counters.per_category {
            let _ = writeln!(out, "  {:>4}  {}", count, category);
        }
    }

    let _ = writeln!(out, "Total API calls: {}", counters.api_calls);
    let _ = writeln!(out, "Errors: {}", counters.errors);
    let _ = writeln!(out, "Duration: {}", format_duration(counters.elapsed()));
    if let Some(dir) = &counters.output_dir {
        let _ = writeln!(out, "Output directory: {}", dir.display());
    }
    let _ = writeln!(out, "{}", rule);
    out
}

/// Discovery summary with the most frequent labels.
pub fn render_discovery(
    counters: &RunCounters,
    top: &[(String, u64)],
    total_types: usize,
    catalog_path: &std::path::Path,
) -> String {
    let mut out = String::new();
    let rule = "=".repeat(50);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "DISCOVERY COMPLETE");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Document types found: {}", total_types);
    let _ = writeln!(out, "Catalog saved to: {}", catalog_path.display());
    let _ = writeln!(out, "Total API calls: {}", counters.api_calls);
    let _ = writeln!(out, "Errors: {}", counters.errors);
    let _ = writeln!(out, "Duration: {}", format_duration(counters.elapsed()));
    if !top.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Top {} document types:", top.len());
        for (label, count) in top {
            let _ = writeln!(out, "  {:>5}  {}", count, label);
        }
    }
    let _ = writeln!(out, "{}", rule);
    out
}

/// Seconds with one decimal below a minute, `Xm Ys` above.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1} seconds", secs)
    } else {
        let whole = d.as_secs();
        format!("{}m {}s", whole / 60, whole % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_download_attributes_category() {
        let mut c = RunCounters::new(&["Order".into(), "Decision".into()]);
        c.record_download("Decision");
        c.record_download("Decision");
        assert_eq!(c.newly_downloaded, 2);
        assert_eq!(c.category_count("Decision"), 2);
        assert_eq!(c.category_count("Order"), 0);
        assert_eq!(c.category_count("Unknown"), 0);
    }

    #[test]
    fn extraction_summary_reports_errors_even_when_empty() {
        let mut c = RunCounters::new(&["Order".into()]);
        c.errors = 3;
        c.finish();
        let text = render_extraction(&c);
        assert!(text.contains("New documents downloaded: 0"));
        assert!(text.contains("Errors: 3"));
        assert!(text.contains("   0  Order"));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5 seconds");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
