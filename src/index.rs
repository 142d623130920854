//! Index of documents already present under the output root.
//!
//! Built once per run by walking every subfolder for PDFs. Identity is read
//! from the JSON sidecar when it parses, otherwise from the filename
//! (`{docket}_{entryId}_{date}.pdf`). Anything unreadable is skipped with a
//! warning.

use anyhow::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::{DocumentMetadata, IdentityKey};

/// Snapshot of identity keys on disk, extended in memory as the run downloads.
#[derive(Debug, Default)]
pub struct ExistingIndex {
    keys: HashSet<IdentityKey>,
}

impl ExistingIndex {
    /// Walk `root` recursively. A missing root yields an empty index.
    pub fn scan(root: &Path) -> Result<Self> {
        let mut index = Self::default();
        if !root.exists() {
            return Ok(index);
        }

        let pdf_set = build_globset(&["**/*.pdf"])?;

        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable path in output directory");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if !pdf_set.is_match(relative) {
                continue;
            }

            match identify(path) {
                Some(key) => {
                    index.keys.insert(key);
                }
                None => warn!(
                    path = %path.display(),
                    "could not recover document identity; ignoring file"
                ),
            }
        }

        debug!(count = index.keys.len(), root = %root.display(), "indexed existing documents");
        Ok(index)
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.keys.contains(key)
    }

    /// Record a key. Returns `false` if it was already present.
    pub fn insert(&mut self, key: IdentityKey) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn identify(pdf_path: &Path) -> Option<IdentityKey> {
    let sidecar = pdf_path.with_extension("json");
    if sidecar.is_file() {
        match read_sidecar(&sidecar) {
            Ok(meta) => return Some(meta.key()),
            Err(e) => warn!(
                path = %sidecar.display(),
                error = %e,
                "malformed metadata sidecar; falling back to filename"
            ),
        }
    }
    key_from_filename(pdf_path)
}

fn read_sidecar(path: &Path) -> Result<DocumentMetadata> {
    let content = std::fs::read_to_string(path)?;
    let meta: DocumentMetadata = serde_json::from_str(&content)?;
    if meta.docket_number.is_empty() || meta.entry_id.is_empty() {
        anyhow::bail!("sidecar is missing docketNumber or entryId");
    }
    Ok(meta)
}

/// Recover `(docket, entryId)` from `{docket}_{entryId}_{date}.pdf`.
pub fn key_from_filename(path: &Path) -> Option<IdentityKey> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.split('_');
    let docket = parts.next().filter(|s| !s.is_empty())?;
    let entry_id = parts.next().filter(|s| !s.is_empty())?;
    Some(IdentityKey::new(docket, entry_id))
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_root_is_empty() {
        let index = ExistingIndex::scan(Path::new("/nonexistent/output")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn filename_parsing() {
        let key = key_from_filename(Path::new("x/12345-21_abc-def_2021-03-04.pdf")).unwrap();
        assert_eq!(key, IdentityKey::new("12345-21", "abc-def"));
        assert!(key_from_filename(Path::new("orphan.pdf")).is_none());
        assert!(key_from_filename(Path::new("_abc_2021.pdf")).is_none());
    }

    #[test]
    fn scans_nested_runs_and_prefers_sidecar() {
        let tmp = TempDir::new().unwrap();
        let run_a = tmp.path().join("order_2026-01-01_000000");
        let run_b = tmp.path().join("nested").join("decision_2026-01-02_000000");
        fs::create_dir_all(&run_a).unwrap();
        fs::create_dir_all(&run_b).unwrap();

        fs::write(run_a.join("101-20_e1_2020-01-01.pdf"), b"%PDF").unwrap();
        fs::write(run_b.join("202-21_e2_Unknown.PDF"), b"%PDF").unwrap();

        // Sidecar carries the unsanitized docket number.
        fs::write(run_b.join("303-22_e3_2022-02-02.pdf"), b"%PDF").unwrap();
        fs::write(
            run_b.join("303-22_e3_2022-02-02.json"),
            r#"{"docketNumber":"303/22","documentType":"Decision","filedDate":"2022-02-02","description":"","entryId":"e3"}"#,
        )
        .unwrap();

        // Leftovers that must not count.
        fs::write(run_a.join("101-20_e9_2020-01-01.pdf.part"), b"%PD").unwrap();
        fs::write(run_a.join("notes.txt"), b"hello").unwrap();

        let index = ExistingIndex::scan(tmp.path()).unwrap();
        assert_eq!(index.len(), 3);
        assert!(index.contains(&IdentityKey::new("101-20", "e1")));
        assert!(index.contains(&IdentityKey::new("202-21", "e2")));
        assert!(index.contains(&IdentityKey::new("303/22", "e3")));
        assert!(!index.contains(&IdentityKey::new("101-20", "e9")));
    }

    #[test]
    fn malformed_sidecar_falls_back_to_filename() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("404-23_e4_2023-01-01.pdf"), b"%PDF").unwrap();
        fs::write(tmp.path().join("404-23_e4_2023-01-01.json"), b"{not json").unwrap();
        fs::write(tmp.path().join("garbage.pdf"), b"%PDF").unwrap();

        let index = ExistingIndex::scan(tmp.path()).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains(&IdentityKey::new("404-23", "e4")));
    }

    #[test]
    fn insert_reports_novelty() {
        let mut index = ExistingIndex::default();
        assert!(index.insert(IdentityKey::new("1-20", "a")));
        assert!(!index.insert(IdentityKey::new("1-20", "a")));
    }
}
