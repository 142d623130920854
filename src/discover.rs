//! Document type discovery.
//!
//! Samples dockets from a broad set of keyword searches and tallies every
//! document type label seen on their docket entries, with no category
//! filtering. The tally is written as a JSON catalog, replacing any previous
//! one, and can be listed later without touching the API.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

use crate::client::{ApiClient, Transport};
use crate::config::Config;
use crate::extract::search_candidates;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::summary::RunCounters;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCatalogEntry {
    pub label: String,
    pub count: u64,
}

/// Discovery output, sorted by descending frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub discovered_at: DateTime<Utc>,
    pub total_types: usize,
    #[serde(default)]
    pub dockets_sampled: usize,
    pub types: Vec<TypeCatalogEntry>,
}

impl Catalog {
    pub fn from_tally(tally: HashMap<String, u64>, dockets_sampled: usize) -> Self {
        let mut types: Vec<TypeCatalogEntry> = tally
            .into_iter()
            .map(|(label, count)| TypeCatalogEntry { label, count })
            .collect();
        types.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        Self {
            discovered_at: Utc::now(),
            total_types: types.len(),
            dockets_sampled,
            types,
        }
    }

    pub fn count_of(&self, label: &str) -> Option<u64> {
        self.types.iter().find(|t| t.label == label).map(|t| t.count)
    }
}

pub struct DiscoveryReport {
    pub catalog: Catalog,
    pub counters: RunCounters,
}

/// Survey a sample of dockets and write the type catalog.
pub async fn run_discovery<T: Transport, R: Rng + ?Sized>(
    config: &Config,
    client: &mut ApiClient<T>,
    rng: &mut R,
    progress: &dyn ProgressReporter,
) -> Result<DiscoveryReport> {
    let mut counters = RunCounters::new(&[]);
    let calls_before = client.api_calls();

    let mut candidates = search_candidates(
        client,
        &config.discovery.keywords,
        None,
        &mut counters,
        progress,
    )
    .await;
    candidates.shuffle(rng);
    candidates.truncate(config.discovery.sample_size);

    info!(sample = candidates.len(), "surveying dockets");

    let total = candidates.len() as u64;
    let mut tally: HashMap<String, u64> = HashMap::new();
    let mut sampled = 0usize;

    for (i, docket) in candidates.iter().enumerate() {
        progress.report(ProgressEvent::Visiting {
            docket: docket.clone(),
            n: i as u64 + 1,
            total,
        });

        let detail = match client.case_detail(docket).await {
            Ok(d) => d,
            Err(e) => {
                counters.errors += 1;
                warn!(docket = %docket, endpoint = "cases", error = %e, "case lookup failed");
                continue;
            }
        };
        sampled += 1;

        let labels = detail
            .docket_entries
            .iter()
            .filter_map(|e| e.document_type.as_deref())
            .map(str::trim)
            .filter(|l| !l.is_empty());
        for label in labels {
            *tally.entry(label.to_string()).or_insert(0) += 1;
        }
    }

    let catalog = Catalog::from_tally(tally, sampled);
    write_catalog(&config.output.catalog_path, &catalog)?;

    counters.api_calls = client.api_calls() - calls_before;
    counters.finish();
    Ok(DiscoveryReport { catalog, counters })
}

/// Overwrite the catalog file.
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(catalog)?;
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    std::fs::write(&part, json)
        .and_then(|_| std::fs::rename(&part, path))
        .with_context(|| format!("Failed to write catalog: {}", path.display()))?;
    Ok(())
}

/// Read a catalog; `None` if it has not been created yet.
pub fn read_catalog(path: &Path) -> Result<Option<Catalog>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
    let catalog = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
    Ok(Some(catalog))
}

/// Render a catalog (or the hint for a missing one) for `--list-types`.
pub fn render_catalog(catalog: Option<&Catalog>) -> String {
    let mut out = String::new();
    let Some(catalog) = catalog else {
        let _ = writeln!(out, "No document type catalog found.");
        let _ = writeln!(
            out,
            "Run with --discover first to catalog document types from the API."
        );
        return out;
    };

    let _ = writeln!(out, "=== DAWSON Document Types ===");
    let _ = writeln!(
        out,
        "Discovered: {}",
        catalog.discovered_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "Total types: {}", catalog.total_types);
    let _ = writeln!(out);
    let _ = writeln!(out, "{:>6}  Type", "Count");
    let _ = writeln!(out, "{}", "-".repeat(50));
    for t in &catalog.types {
        let _ = writeln!(out, "{:>6}  {}", t.count, t.label);
    }
    let _ = writeln!(out, "{}", "-".repeat(50));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "To use exact matching, add types to extract.document_types"
    );
    let _ = writeln!(out, "and set extract.match_mode = \"exact\".");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tally_sorted_by_descending_count_then_label() {
        let tally = HashMap::from([
            ("Order".to_string(), 3),
            ("Decision".to_string(), 7),
            ("Notice".to_string(), 3),
        ]);
        let catalog = Catalog::from_tally(tally, 2);
        let labels: Vec<_> = catalog.types.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Decision", "Notice", "Order"]);
        assert_eq!(catalog.total_types, 3);
    }

    #[test]
    fn write_overwrites_and_reads_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.json");

        let first = Catalog::from_tally(HashMap::from([("Order".to_string(), 1)]), 1);
        write_catalog(&path, &first).unwrap();
        let second = Catalog::from_tally(HashMap::from([("Decision".to_string(), 2)]), 1);
        write_catalog(&path, &second).unwrap();

        let loaded = read_catalog(&path).unwrap().unwrap();
        assert_eq!(loaded.types, second.types);
        assert_eq!(loaded.count_of("Order"), None);
    }

    #[test]
    fn missing_catalog_renders_hint() {
        let tmp = TempDir::new().unwrap();
        assert!(read_catalog(&tmp.path().join("none.json")).unwrap().is_none());
        assert!(render_catalog(None).contains("--discover"));
    }

    #[test]
    fn render_lists_every_type() {
        let catalog = Catalog::from_tally(
            HashMap::from([("Order".to_string(), 12), ("Decision".to_string(), 4)]),
            3,
        );
        let text = render_catalog(Some(&catalog));
        assert!(text.contains("    12  Order"));
        assert!(text.contains("     4  Decision"));
        assert!(text.contains("Total types: 2"));
    }
}
