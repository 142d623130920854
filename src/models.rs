//! Core data types.
//!
//! Wire types mirror the JSON returned by the public API and are converted
//! into the typed [`DocketEntry`] before filtering. [`DocumentMetadata`] is the
//! sidecar record persisted next to every downloaded PDF.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a downloadable document, used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub docket_number: String,
    pub entry_id: String,
}

impl IdentityKey {
    pub fn new(docket_number: impl Into<String>, entry_id: impl Into<String>) -> Self {
        Self {
            docket_number: docket_number.into(),
            entry_id: entry_id.into(),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.docket_number, self.entry_id)
    }
}

// ============ Wire types ============

/// One hit from `/public-api/order-search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(default)]
    pub docket_number: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
}

/// The search endpoint has returned both a wrapped and a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Wrapped { results: Vec<SearchHit> },
    Bare(Vec<SearchHit>),
}

impl SearchResponse {
    pub fn into_hits(self) -> Vec<SearchHit> {
        match self {
            SearchResponse::Wrapped { results } => results,
            SearchResponse::Bare(hits) => hits,
        }
    }
}

/// Case detail from `/public-api/cases/{docketNumber}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
    #[serde(default)]
    pub docket_number: Option<String>,
    #[serde(default)]
    pub docket_entries: Vec<RawDocketEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocketEntry {
    #[serde(default)]
    pub docket_entry_id: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub filing_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub document_title: Option<String>,
    /// Absent and `null` both mean not sealed.
    #[serde(default)]
    pub is_sealed: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadUrlResponse {
    #[serde(default)]
    pub url: Option<String>,
}

impl CaseDetail {
    /// Typed entries for this case. Entries without an id cannot be
    /// downloaded and are dropped here.
    pub fn entries(&self, requested_docket: &str) -> Vec<DocketEntry> {
        let docket = self
            .docket_number
            .as_deref()
            .unwrap_or(requested_docket)
            .to_string();

        self.docket_entries
            .iter()
            .filter_map(|raw| {
                let entry_id = raw.docket_entry_id.as_deref()?.trim();
                if entry_id.is_empty() {
                    return None;
                }
                Some(DocketEntry {
                    docket_number: docket.clone(),
                    entry_id: entry_id.to_string(),
                    document_type: raw.document_type.clone().unwrap_or_default(),
                    filed_date: raw.filing_date.as_deref().and_then(parse_filed_date),
                    description: raw
                        .description
                        .as_deref()
                        .filter(|d| !d.trim().is_empty())
                        .or(raw.document_title.as_deref())
                        .unwrap_or_default()
                        .to_string(),
                    is_sealed: raw.is_sealed.unwrap_or(false),
                    // Entries without an explicit format are served as PDF.
                    format: raw.format.clone().unwrap_or_else(|| "pdf".to_string()),
                })
            })
            .collect()
    }
}

/// Accepts `YYYY-MM-DD` optionally followed by a `T...` time component.
pub fn parse_filed_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split('T').next()?.trim();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

// ============ Domain types ============

/// One document attached to a case.
#[derive(Debug, Clone, PartialEq)]
pub struct DocketEntry {
    pub docket_number: String,
    pub entry_id: String,
    pub document_type: String,
    pub filed_date: Option<NaiveDate>,
    pub description: String,
    pub is_sealed: bool,
    pub format: String,
}

impl DocketEntry {
    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(&self.docket_number, &self.entry_id)
    }

    /// Public PDF entries only.
    pub fn is_eligible(&self) -> bool {
        !self.is_sealed && self.format.eq_ignore_ascii_case("pdf")
    }
}

/// Sidecar metadata written next to each downloaded PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub docket_number: String,
    pub document_type: String,
    pub filed_date: Option<NaiveDate>,
    pub description: String,
    pub entry_id: String,
}

impl DocumentMetadata {
    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(&self.docket_number, &self.entry_id)
    }
}

impl From<&DocketEntry> for DocumentMetadata {
    fn from(entry: &DocketEntry) -> Self {
        Self {
            docket_number: entry.docket_number.clone(),
            document_type: entry.document_type.clone(),
            filed_date: entry.filed_date,
            description: entry.description.clone(),
            entry_id: entry.entry_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_accepts_both_shapes() {
        let wrapped: SearchResponse = serde_json::from_str(
            r#"{"results":[{"docketNumber":"101-20","documentType":"Order"}]}"#,
        )
        .unwrap();
        let bare: SearchResponse =
            serde_json::from_str(r#"[{"docketNumber":"101-20"}]"#).unwrap();
        assert_eq!(wrapped.into_hits()[0].document_type.as_deref(), Some("Order"));
        assert_eq!(bare.into_hits()[0].docket_number.as_deref(), Some("101-20"));
    }

    #[test]
    fn case_detail_entries_skip_missing_ids() {
        let detail: CaseDetail = serde_json::from_str(
            r#"{
                "docketNumber": "101-20",
                "docketEntries": [
                    {"docketEntryId": "a1", "documentType": "Order", "filingDate": "2020-05-01T04:00:00.000Z", "isSealed": false},
                    {"documentType": "Decision"},
                    {"docketEntryId": "b2", "documentType": "Decision", "isSealed": true, "format": "docx"}
                ]
            }"#,
        )
        .unwrap();

        let entries = detail.entries("101-20");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].filed_date, NaiveDate::from_ymd_opt(2020, 5, 1));
        assert!(entries[0].is_eligible());
        assert!(!entries[1].is_eligible());
    }

    #[test]
    fn entry_with_description_and_title_decodes() {
        let detail: CaseDetail = serde_json::from_str(
            r#"{"docketNumber":"101-20","docketEntries":[
                {"docketEntryId":"a1","documentType":"Order","description":"Order","documentTitle":"Order of Dismissal","isSealed":false},
                {"docketEntryId":"b2","documentType":"Order","documentTitle":"Order for Filing Fee"}
            ]}"#,
        )
        .unwrap();

        let entries = detail.entries("101-20");
        assert_eq!(entries[0].description, "Order");
        assert_eq!(entries[1].description, "Order for Filing Fee");
    }

    #[test]
    fn null_sealed_flag_means_public() {
        let detail: CaseDetail = serde_json::from_str(
            r#"{"docketEntries":[{"docketEntryId":"a1","documentType":"Order","isSealed":null}]}"#,
        )
        .unwrap();

        let entries = detail.entries("101-20");
        assert!(!entries[0].is_sealed);
        assert!(entries[0].is_eligible());
    }

    #[test]
    fn filed_date_parsing() {
        assert_eq!(
            parse_filed_date("2021-11-30"),
            NaiveDate::from_ymd_opt(2021, 11, 30)
        );
        assert_eq!(parse_filed_date("Unknown"), None);
    }

    #[test]
    fn metadata_uses_camel_case() {
        let meta = DocumentMetadata {
            docket_number: "101-20".into(),
            document_type: "Order".into(),
            filed_date: NaiveDate::from_ymd_opt(2020, 5, 1),
            description: "Order of Dismissal".into(),
            entry_id: "a1".into(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["docketNumber"], "101-20");
        assert_eq!(json["filedDate"], "2020-05-01");
        assert_eq!(json["entryId"], "a1");
    }
}
