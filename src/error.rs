//! Error types for the extractor.
//!
//! Per-docket and per-document failures ([`ApiError`], [`DownloadError`]) are
//! recoverable: the orchestrator logs them, counts them, and moves on to the
//! next unit of work. [`ConfigError`] is fatal and surfaces before any API call.

use std::path::PathBuf;

use thiserror::Error;

/// Outcome of a failed request against the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The docket or document does not exist (or is not public).
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Network failure, timeout, 5xx, or an unparseable body.
    #[error("transient failure for {url}: {reason}")]
    Transient { url: String, reason: String },
}

impl ApiError {
    pub fn transient(url: impl Into<String>, reason: impl ToString) -> Self {
        ApiError::Transient {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Failure while retrieving or persisting one document.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download URL request failed: {0}")]
    Url(#[source] ApiError),

    #[error("download URL response had no `url` field")]
    MissingUrl,

    #[error("document content fetch failed: {0}")]
    Content(#[source] ApiError),

    /// The signed URL answered with something other than a PDF.
    #[error("document content is not a PDF (starts with {prefix:?})")]
    NotPdf { prefix: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl DownloadError {
    /// Which step of the download failed, for log context.
    pub fn endpoint(&self) -> &'static str {
        match self {
            DownloadError::Url(_) | DownloadError::MissingUrl => "public-document-download-url",
            DownloadError::Content(_) | DownloadError::NotPdf { .. } => "document-content",
            DownloadError::Write { .. } | DownloadError::Metadata(_) => "filesystem",
        }
    }
}

/// Invalid or unreadable settings. Aborts the process at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_errors_name_the_failing_step() {
        let api = || ApiError::transient("http://x", "HTTP 503");
        assert_eq!(
            DownloadError::Url(api()).endpoint(),
            "public-document-download-url"
        );
        assert_eq!(
            DownloadError::MissingUrl.endpoint(),
            "public-document-download-url"
        );
        assert_eq!(DownloadError::Content(api()).endpoint(), "document-content");
        assert_eq!(
            DownloadError::NotPdf {
                prefix: "<html>".into()
            }
            .endpoint(),
            "document-content"
        );
        let write = DownloadError::Write {
            path: PathBuf::from("x.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(write.endpoint(), "filesystem");
    }
}
