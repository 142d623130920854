//! Document download and on-disk layout.
//!
//! Each run writes into its own timestamped subfolder of the output root:
//!
//! ```text
//! downloads/
//! └── order_2026-10-17_143005/
//!     ├── 12345-21_5f2c…_2021-06-01.pdf
//!     └── 12345-21_5f2c…_2021-06-01.json
//! ```
//!
//! Content that does not start with `%PDF` is rejected before anything is
//! written. Files are written to a `.part` path and renamed into place. The
//! sidecar is only written once the PDF is in place, and the PDF is removed
//! again if the sidecar cannot be written, so a failed download leaves no
//! files.

use anyhow::Context;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::client::{ApiClient, Transport};
use crate::error::DownloadError;
use crate::models::DocumentMetadata;

/// Writes downloaded documents into one run folder.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    run_dir: PathBuf,
}

impl DocumentWriter {
    /// Create `<output_root>/<run folder>`.
    pub fn create(
        output_root: &Path,
        filters: &[String],
        now: DateTime<Local>,
    ) -> anyhow::Result<Self> {
        let run_dir = output_root.join(run_folder_name(filters, now));
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create output directory: {}", run_dir.display()))?;
        Ok(Self { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Persist a PDF and its metadata sidecar. Returns the PDF path.
    pub fn write(&self, meta: &DocumentMetadata, pdf: &[u8]) -> Result<PathBuf, DownloadError> {
        let base = base_filename(meta);
        let pdf_path = self.run_dir.join(format!("{}.pdf", base));
        let json_path = self.run_dir.join(format!("{}.json", base));

        write_atomic(&pdf_path, pdf)?;

        let sidecar = match serde_json::to_vec_pretty(meta) {
            Ok(s) => s,
            Err(e) => {
                let _ = std::fs::remove_file(&pdf_path);
                return Err(DownloadError::Metadata(e));
            }
        };
        if let Err(e) = write_atomic(&json_path, &sidecar) {
            let _ = std::fs::remove_file(&pdf_path);
            return Err(e);
        }

        Ok(pdf_path)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let result = std::fs::write(&part, bytes).and_then(|_| std::fs::rename(&part, path));
    if let Err(source) = result {
        let _ = std::fs::remove_file(&part);
        return Err(DownloadError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// Fetch the signed URL, then the PDF, then write both files.
pub async fn download_document<T: Transport>(
    client: &mut ApiClient<T>,
    writer: &DocumentWriter,
    meta: &DocumentMetadata,
) -> Result<PathBuf, DownloadError> {
    let url = client
        .download_url(&meta.docket_number, &meta.entry_id)
        .await
        .map_err(DownloadError::Url)?
        .ok_or(DownloadError::MissingUrl)?;

    let bytes = client
        .fetch_content(&url)
        .await
        .map_err(DownloadError::Content)?;

    if !bytes.starts_with(b"%PDF") {
        let prefix = String::from_utf8_lossy(&bytes[..bytes.len().min(16)]).into_owned();
        return Err(DownloadError::NotPdf { prefix });
    }

    writer.write(meta, &bytes)
}

/// Folder name for one run: type slugs plus a timestamp, or a short
/// `batch_<n>_types_` prefix when many filters would make the name unwieldy.
pub fn run_folder_name(filters: &[String], now: DateTime<Local>) -> String {
    let timestamp = now.format("%Y-%m-%d_%H%M%S");
    if filters.len() > 5 {
        format!("batch_{}_types_{}", filters.len(), timestamp)
    } else {
        let types = filters
            .iter()
            .map(|f| slug(f))
            .collect::<Vec<_>>()
            .join("_");
        format!("{}_{}", types, timestamp)
    }
}

/// `{docket}_{entryId}_{date}`, with separators in the parts replaced so the
/// name can be split back into its components.
pub fn base_filename(meta: &DocumentMetadata) -> String {
    let date = meta
        .filed_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    format!(
        "{}_{}_{}",
        sanitize_component(&meta.docket_number),
        sanitize_component(&meta.entry_id),
        date
    )
}

fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | '_' | ':' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect()
}

fn slug(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::key_from_filename;
    use crate::models::IdentityKey;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn meta(docket: &str, entry: &str) -> DocumentMetadata {
        DocumentMetadata {
            docket_number: docket.into(),
            document_type: "Order".into(),
            filed_date: NaiveDate::from_ymd_opt(2021, 6, 1),
            description: "Order of Dismissal".into(),
            entry_id: entry.into(),
        }
    }

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 17, 14, 30, 5).unwrap()
    }

    #[test]
    fn run_folder_names() {
        let few = vec!["Order".to_string(), "Stipulated Decision".to_string()];
        assert_eq!(
            run_folder_name(&few, fixed_now()),
            "order_stipulated_decision_2026-10-17_143005"
        );
        let many: Vec<String> = (0..6).map(|i| format!("T{}", i)).collect();
        assert_eq!(
            run_folder_name(&many, fixed_now()),
            "batch_6_types_2026-10-17_143005"
        );
    }

    #[test]
    fn base_filename_round_trips_through_index_parser() {
        let m = meta("12345-21", "5f2c-aa");
        let name = format!("{}.pdf", base_filename(&m));
        assert_eq!(name, "12345-21_5f2c-aa_2021-06-01.pdf");
        assert_eq!(
            key_from_filename(Path::new(&name)),
            Some(IdentityKey::new("12345-21", "5f2c-aa"))
        );
    }

    #[test]
    fn unknown_date_and_separators() {
        let mut m = meta("123/21", "e_1");
        m.filed_date = None;
        assert_eq!(base_filename(&m), "123-21_e-1_Unknown");
    }

    #[test]
    fn write_produces_pair_and_no_part_files() {
        let tmp = TempDir::new().unwrap();
        let writer = DocumentWriter::create(tmp.path(), &["Order".into()], fixed_now()).unwrap();
        let pdf = writer.write(&meta("1-21", "e1"), b"%PDF-1.7").unwrap();

        assert!(pdf.is_file());
        let sidecar = pdf.with_extension("json");
        let parsed: DocumentMetadata =
            serde_json::from_str(&std::fs::read_to_string(sidecar).unwrap()).unwrap();
        assert_eq!(parsed, meta("1-21", "e1"));

        let leftovers = std::fs::read_dir(writer.run_dir())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".part")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn failed_sidecar_removes_pdf() {
        let tmp = TempDir::new().unwrap();
        let writer = DocumentWriter::create(tmp.path(), &["Order".into()], fixed_now()).unwrap();
        let m = meta("1-21", "e1");
        // A directory squatting on the sidecar path makes the rename fail.
        let json_path = writer.run_dir().join(format!("{}.json", base_filename(&m)));
        std::fs::create_dir_all(json_path.join("occupied")).unwrap();

        let err = writer.write(&m, b"%PDF").unwrap_err();
        assert!(matches!(err, DownloadError::Write { .. }));
        assert!(!writer
            .run_dir()
            .join(format!("{}.pdf", base_filename(&m)))
            .exists());
    }
}
