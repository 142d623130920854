//! Extraction orchestration.
//!
//! Coordinates one extraction run: keyword search → candidate shuffle →
//! per-docket case lookup → eligibility and type filtering → dedup → download.
//!
//! # Stopping
//!
//! The run ends when `target_count` new documents have been downloaded, or
//! when every candidate docket has been visited. With `min_per_type > 0` it
//! also keeps going (past the target if needed) until every configured
//! category has at least that many downloads.
//!
//! # Balancing
//!
//! While some category is below its minimum, a matching entry whose own
//! category has already reached the minimum is parked in a deferred queue
//! instead of being downloaded. Once all minimums are met the queue is drained
//! first (it costs no extra case lookups), then the remaining dockets fill
//! whatever capacity is left up to the target.
//!
//! Every per-docket and per-document failure is logged, counted in
//! [`RunCounters::errors`], and skipped. Only failing to create the output
//! directory aborts the run.

use anyhow::{Context, Result};
use chrono::Local;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

use crate::client::{ApiClient, Transport};
use crate::config::{Config, MatchMode};
use crate::download::{download_document, DocumentWriter};
use crate::index::ExistingIndex;
use crate::matcher;
use crate::models::{DocketEntry, DocumentMetadata};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::summary::RunCounters;

/// Run one extraction pass and return its counters.
pub async fn run_extraction<T: Transport, R: Rng + ?Sized>(
    config: &Config,
    client: &mut ApiClient<T>,
    rng: &mut R,
    progress: &dyn ProgressReporter,
) -> Result<RunCounters> {
    let extract = &config.extract;
    let root = &config.output.root;

    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create output root: {}", root.display()))?;
    let writer = DocumentWriter::create(root, &extract.document_types, Local::now())?;
    let index = ExistingIndex::scan(root)?;

    let mut counters = RunCounters::new(&extract.document_types);
    counters.output_dir = Some(writer.run_dir().to_path_buf());
    let calls_before = client.api_calls();

    let target = if extract.count_existing_toward_target {
        extract.target_count.saturating_sub(index.len() as u64)
    } else {
        extract.target_count
    };

    info!(
        target,
        existing = index.len(),
        types = %extract.document_types.join(", "),
        min_per_type = extract.min_per_type,
        environment = client.base_url(),
        output = %writer.run_dir().display(),
        "starting extraction"
    );

    let nothing_to_do = target == 0
        && (extract.min_per_type == 0 || extract.count_existing_toward_target);
    if nothing_to_do {
        info!("already have enough documents; nothing to download");
        counters.library_total = index.len();
        counters.finish();
        return Ok(counters);
    }

    let hit_filter = extract
        .filter_search_hits
        .then_some((extract.document_types.as_slice(), extract.match_mode));
    let mut candidates = search_candidates(
        client,
        &extract.search_keywords,
        hit_filter,
        &mut counters,
        progress,
    )
    .await;

    if candidates.is_empty() {
        warn!("search returned no dockets");
    }
    candidates.shuffle(rng);

    let mut run = Extraction {
        config,
        client,
        writer: &writer,
        index,
        counters,
        deferred: VecDeque::new(),
        target,
        progress,
    };
    run.visit_all(&candidates).await;

    let Extraction {
        index,
        mut counters,
        client,
        ..
    } = run;
    counters.api_calls = client.api_calls() - calls_before;
    counters.library_total = index.len();
    counters.finish();
    Ok(counters)
}

/// Run every keyword search and return the de-duplicated docket numbers in
/// first-seen order.
///
/// With `hit_filter`, hits whose own `documentType` does not match are
/// dropped; hits without a type label are always kept. Failed searches are
/// counted as errors and contribute nothing.
pub async fn search_candidates<T: Transport>(
    client: &mut ApiClient<T>,
    keywords: &[String],
    hit_filter: Option<(&[String], MatchMode)>,
    counters: &mut RunCounters,
    progress: &dyn ProgressReporter,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dockets = Vec::new();

    for keyword in keywords {
        progress.report(ProgressEvent::Searching {
            keyword: keyword.clone(),
        });

        let hits = match client.search(keyword).await {
            Ok(h) => h,
            Err(e) => {
                counters.errors += 1;
                warn!(keyword = %keyword, endpoint = "order-search", error = %e, "search failed");
                continue;
            }
        };

        let before = dockets.len();
        for hit in hits {
            let Some(docket) = hit.docket_number.filter(|d| !d.trim().is_empty()) else {
                continue;
            };
            if let (Some((filters, mode)), Some(label)) = (hit_filter, hit.document_type.as_deref())
            {
                if !matcher::matches(label, filters, mode) {
                    continue;
                }
            }
            if seen.insert(docket.clone()) {
                dockets.push(docket);
            }
        }
        info!(keyword = %keyword, new_dockets = dockets.len() - before, "search complete");
    }

    dockets
}

/// Eligible entries that match a category, paired with the category they
/// are attributed to (the first matching filter).
pub fn select_entries<'f>(
    entries: Vec<DocketEntry>,
    filters: &'f [String],
    mode: MatchMode,
) -> Vec<(DocketEntry, &'f str)> {
    entries
        .into_iter()
        .filter(|entry| {
            if !entry.is_eligible() {
                debug!(
                    docket = %entry.docket_number,
                    entry = %entry.entry_id,
                    sealed = entry.is_sealed,
                    format = %entry.format,
                    "skipping non-public or non-PDF entry"
                );
                return false;
            }
            true
        })
        .filter_map(|entry| {
            let category = matcher::category_of(&entry.document_type, filters, mode)?;
            Some((entry, category))
        })
        .collect()
}

struct Extraction<'a, T> {
    config: &'a Config,
    client: &'a mut ApiClient<T>,
    writer: &'a DocumentWriter,
    index: ExistingIndex,
    counters: RunCounters,
    deferred: VecDeque<(DocketEntry, &'a str)>,
    target: u64,
    progress: &'a dyn ProgressReporter,
}

impl<'a, T: Transport> Extraction<'a, T> {
    async fn visit_all(&mut self, candidates: &[String]) {
        let config = self.config;
        let filters: &'a [String] = &config.extract.document_types;
        let mode = config.extract.match_mode;
        let total = candidates.len() as u64;

        for (i, docket) in candidates.iter().enumerate() {
            if self.done() {
                break;
            }
            self.progress.report(ProgressEvent::Visiting {
                docket: docket.clone(),
                n: i as u64 + 1,
                total,
            });

            let detail = match self.client.case_detail(docket).await {
                Ok(d) => d,
                Err(e) => {
                    self.counters.errors += 1;
                    warn!(docket = %docket, endpoint = "cases", error = %e, "case lookup failed");
                    continue;
                }
            };

            let matching = select_entries(detail.entries(docket), filters, mode);
            if matching.is_empty() {
                debug!(docket = %docket, "no matching documents");
                continue;
            }
            debug!(docket = %docket, count = matching.len(), "matching documents");

            for (entry, category) in matching {
                if self.done() {
                    break;
                }
                if self.index.contains(&entry.key()) {
                    self.counters.skipped_existing += 1;
                    continue;
                }
                if self.should_take(category) {
                    self.download(entry, category).await;
                } else {
                    debug!(
                        docket = %entry.docket_number,
                        entry = %entry.entry_id,
                        category,
                        "deferring entry until other categories reach their minimum"
                    );
                    self.deferred.push_back((entry, category));
                }
            }

            if self.minimums_met() {
                self.drain_deferred().await;
            }
        }

        if self.minimums_met() {
            self.drain_deferred().await;
        }

        if !self.minimums_met() {
            warn!("candidates exhausted before every category reached its minimum");
        } else if self.counters.newly_downloaded < self.target {
            info!(
                downloaded = self.counters.newly_downloaded,
                target = self.target,
                "candidates exhausted before reaching target"
            );
        }
    }

    async fn drain_deferred(&mut self) {
        while self.counters.newly_downloaded < self.target {
            let Some((entry, category)) = self.deferred.pop_front() else {
                break;
            };
            if self.index.contains(&entry.key()) {
                continue;
            }
            self.download(entry, category).await;
        }
    }

    async fn download(&mut self, entry: DocketEntry, category: &str) {
        let meta = DocumentMetadata::from(&entry);
        match download_document(self.client, self.writer, &meta).await {
            Ok(path) => {
                self.counters.record_download(category);
                self.index.insert(entry.key());
                let file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                info!(docket = %entry.docket_number, entry = %entry.entry_id, category, "downloaded");
                self.progress.report(ProgressEvent::Downloaded {
                    file,
                    n: self.counters.newly_downloaded,
                    target: self.target,
                });
            }
            Err(e) => {
                self.counters.errors += 1;
                warn!(
                    docket = %entry.docket_number,
                    entry = %entry.entry_id,
                    endpoint = e.endpoint(),
                    error = %e,
                    "download failed"
                );
            }
        }
    }

    fn min(&self) -> u64 {
        self.config.extract.min_per_type
    }

    fn below_min(&self, category: &str) -> bool {
        self.counters.category_count(category) < self.min()
    }

    fn minimums_met(&self) -> bool {
        self.min() == 0
            || self
                .counters
                .per_category
                .iter()
                .all(|(_, n)| *n >= self.min())
    }

    fn target_reached(&self) -> bool {
        self.counters.newly_downloaded >= self.target
    }

    fn done(&self) -> bool {
        self.target_reached() && self.minimums_met()
    }

    /// Whether a new matching entry of `category` should be downloaded now.
    fn should_take(&self, category: &str) -> bool {
        if self.min() > 0 && self.below_min(category) {
            return true;
        }
        self.minimums_met() && !self.target_reached()
    }
}
