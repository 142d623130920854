//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration equivalent to:
//!
//! ```toml
//! [extract]
//! target_count = 10
//! document_types = ["Order"]
//! match_mode = "substring"
//! min_per_type = 0
//! search_keywords = ["order"]
//!
//! [api]
//! environment = "green"
//! rate_limit_delay_secs = 1.0
//!
//! [output]
//! root = "downloads"
//! catalog_path = "document_types_catalog.json"
//!
//! [discovery]
//! sample_size = 50
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// How a document type label is compared against the configured filters.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Substring,
    Exact,
}

/// The two interchangeable public API deployments.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiEnvironment {
    #[default]
    Green,
    Blue,
}

impl ApiEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            ApiEnvironment::Green => "https://public-api-green.dawson.ustaxcourt.gov",
            ApiEnvironment::Blue => "https://public-api-blue.dawson.ustaxcourt.gov",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiEnvironment::Green => "green",
            ApiEnvironment::Blue => "blue",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    #[serde(default = "default_target_count")]
    pub target_count: u64,
    /// Category filters, in priority order for attribution.
    #[serde(default = "default_document_types")]
    pub document_types: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Minimum downloads per category before the target may be filled freely.
    /// Zero disables balancing.
    #[serde(default)]
    pub min_per_type: u64,
    #[serde(default = "default_search_keywords")]
    pub search_keywords: Vec<String>,
    /// Drop search hits whose own `documentType` does not match the filters.
    #[serde(default)]
    pub filter_search_hits: bool,
    /// Treat `target_count` as the desired library size rather than the
    /// number of new downloads for this run.
    #[serde(default)]
    pub count_existing_toward_target: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            document_types: default_document_types(),
            match_mode: MatchMode::default(),
            min_per_type: 0,
            search_keywords: default_search_keywords(),
            filter_search_hits: false,
            count_existing_toward_target: false,
        }
    }
}

fn default_target_count() -> u64 {
    10
}
fn default_document_types() -> Vec<String> {
    vec!["Order".to_string()]
}
fn default_search_keywords() -> Vec<String> {
    vec!["order".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default)]
    pub environment: ApiEnvironment,
    /// Overrides the environment's base URL (mirrors, local test servers).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay_secs: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_date_range")]
    pub date_range: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            environment: ApiEnvironment::default(),
            base_url: None,
            rate_limit_delay_secs: default_rate_limit_delay(),
            timeout_secs: default_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            user_agent: default_user_agent(),
            date_range: default_date_range(),
            search_limit: default_search_limit(),
        }
    }
}

impl ApiConfig {
    pub fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => self.environment.base_url().to_string(),
        }
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit_delay_secs)
    }
}

fn default_rate_limit_delay() -> f64 {
    1.0
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_download_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    format!(
        "DAWSON-Extractor/{} (Educational/Research)",
        env!("CARGO_PKG_VERSION")
    )
}
fn default_date_range() -> String {
    "allDates".to_string()
}
fn default_search_limit() -> u32 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
            catalog_path: default_catalog_path(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("downloads")
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("document_types_catalog.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    #[serde(default = "default_discovery_keywords")]
    pub keywords: Vec<String>,
    /// Maximum number of dockets visited per discovery run.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            keywords: default_discovery_keywords(),
            sample_size: default_sample_size(),
        }
    }
}

fn default_discovery_keywords() -> Vec<String> {
    [
        "order",
        "motion",
        "decision",
        "opinion",
        "petition",
        "dismissal",
        "closing",
        "brief",
        "memorandum",
        "notice",
        "stipulation",
        "response",
        "reply",
        "objection",
        "report",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_sample_size() -> usize {
    50
}

/// Parse and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(path, &content)
}

/// Load `path` if it exists, otherwise fall back to built-in defaults.
///
/// Used for the implicit default config location; an explicitly named file
/// must go through [`load_config`].
pub fn load_config_or_default(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        load_config(path)
    } else {
        let config = Config::default();
        validate(&config)?;
        Ok(config)
    }
}

pub fn parse_config(path: &Path, content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let extract = &config.extract;
    if extract.document_types.is_empty() {
        return Err(ConfigError::Invalid(
            "extract.document_types must not be empty".into(),
        ));
    }
    if extract.document_types.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Invalid(
            "extract.document_types must not contain blank entries".into(),
        ));
    }
    let mut seen = HashSet::new();
    for filter in &extract.document_types {
        if !seen.insert(filter.trim().to_lowercase()) {
            return Err(ConfigError::Invalid(format!(
                "extract.document_types lists {:?} more than once (case-insensitive)",
                filter
            )));
        }
    }
    if extract.search_keywords.is_empty() {
        return Err(ConfigError::Invalid(
            "extract.search_keywords must not be empty".into(),
        ));
    }

    let delay = config.api.rate_limit_delay_secs;
    if delay <= 0.0 || Duration::try_from_secs_f64(delay).is_err() {
        return Err(ConfigError::Invalid(format!(
            "api.rate_limit_delay_secs must be > 0 (got {})",
            delay
        )));
    }
    if config.api.timeout_secs == 0 || config.api.download_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "api timeouts must be > 0 seconds".into(),
        ));
    }

    if config.discovery.sample_size == 0 {
        return Err(ConfigError::Invalid(
            "discovery.sample_size must be >= 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Config, ConfigError> {
        parse_config(Path::new("test.toml"), s)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.extract.target_count, 10);
        assert_eq!(cfg.extract.document_types, vec!["Order"]);
        assert_eq!(cfg.extract.match_mode, MatchMode::Substring);
        assert_eq!(cfg.api.environment, ApiEnvironment::Green);
        assert_eq!(cfg.api.rate_limit_delay_secs, 1.0);
        assert_eq!(cfg.output.root, PathBuf::from("downloads"));
        assert_eq!(cfg.discovery.keywords.len(), 15);
    }

    #[test]
    fn parses_full_config() {
        let cfg = parse(
            r#"
[extract]
target_count = 25
document_types = ["Order of Dismissal", "Decision"]
match_mode = "exact"
min_per_type = 5
search_keywords = ["dismissal", "decision"]

[api]
environment = "blue"
rate_limit_delay_secs = 2.5

[output]
root = "/tmp/out"
"#,
        )
        .unwrap();
        assert_eq!(cfg.extract.target_count, 25);
        assert_eq!(cfg.extract.match_mode, MatchMode::Exact);
        assert_eq!(cfg.extract.min_per_type, 5);
        assert_eq!(cfg.api.environment, ApiEnvironment::Blue);
        assert_eq!(
            cfg.api.resolved_base_url(),
            "https://public-api-blue.dawson.ustaxcourt.gov"
        );
        assert_eq!(cfg.api.rate_limit_delay(), Duration::from_millis(2500));
    }

    #[test]
    fn base_url_override_strips_trailing_slash() {
        let cfg = parse("[api]\nbase_url = \"http://localhost:9000/\"\n").unwrap();
        assert_eq!(cfg.api.resolved_base_url(), "http://localhost:9000");
    }

    #[test]
    fn rejects_non_positive_delay() {
        for bad in ["0.0", "-1.0", "1e30", "nan", "inf"] {
            let err = parse(&format!("[api]\nrate_limit_delay_secs = {}\n", bad)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "accepted {}", bad);
        }
    }

    #[test]
    fn rejects_empty_filters() {
        let err = parse("[extract]\ndocument_types = []\n").unwrap_err();
        assert!(err.to_string().contains("document_types"));
    }

    #[test]
    fn rejects_duplicate_filters_ignoring_case() {
        let err = parse("[extract]\ndocument_types = [\"Order\", \" order\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_unknown_environment() {
        let err = parse("[api]\nenvironment = \"purple\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_default_file_falls_back() {
        let cfg = load_config_or_default(Path::new("/nonexistent/dawson.toml")).unwrap();
        assert_eq!(cfg.extract.target_count, 10);
    }

    #[test]
    fn example_config_is_valid() {
        let cfg = parse(include_str!("../config/dawson.example.toml")).unwrap();
        assert_eq!(cfg.extract.min_per_type, 5);
        assert_eq!(cfg.extract.document_types.len(), 3);
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let err = load_config(Path::new("/nonexistent/dawson.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
