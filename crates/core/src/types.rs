use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Suffix appended to a record's key to reach its binary sibling entry.
pub const BLOB_SUFFIX: &str = "^bytes";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_redirects: 30,
            user_agent: "SiteCrawler/1.0".to_string(),
            headers: HashMap::new(),
        }
    }
}

/// A fetch scheduler queue message: `QMsg{source_url, url, depth, retry_count}` (spec.md §4.5).
#[derive(Debug, Clone)]
pub struct QMsg {
    pub source_url: Option<String>,
    pub url: String,
    pub depth: u32,
    pub retry_count: u32,
}

impl QMsg {
    pub fn seed(url: String) -> Self {
        QMsg {
            source_url: None,
            url,
            depth: 0,
            retry_count: 0,
        }
    }

    pub fn child(source_url: String, url: String, depth: u32) -> Self {
        QMsg {
            source_url: Some(source_url),
            url,
            depth,
            retry_count: 0,
        }
    }
}

/// A stored record, keyed by URL. Carries the base fields shared by
/// every outcome plus a variant-specific payload (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Content(ContentRecord),
    Redirect(RedirectRecord),
    Error(ErrorRecord),
}

impl Record {
    pub fn crawled(&self) -> f64 {
        match self {
            Record::Content(r) => r.crawled,
            Record::Redirect(r) => r.crawled,
            Record::Error(r) => r.crawled,
        }
    }

    pub fn is_content(&self) -> bool {
        matches!(self, Record::Content(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(rename = "_content")]
    pub content: String,
    pub content_type: String,
    pub crawled: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_last_modified: Option<String>,
    #[serde(default)]
    pub parsed_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_url_s: Option<String>,
    /// Derived fields from the extraction rule-set, plus any enrichment
    /// (binary-text / article-parser) merged fields. Open bag because
    /// field names are user-declared.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectRecord {
    pub redirected_url: String,
    pub crawled: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_last_modified: Option<String>,
    #[serde(default)]
    pub parsed_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error_code: String,
    #[serde(rename = "_content")]
    pub content: String,
    pub crawled: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_last_modified: Option<String>,
    #[serde(default)]
    pub parsed_hash: String,
}

/// Rule-set schema (spec.md §4.7). Exactly one of `css`/`regex`/
/// `fixed_value` is expected to be set; if none are, the field resolves
/// to `default_value` or empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractionRules(pub Vec<ExtractionRule>);

impl ExtractionRules {
    /// A stable 32-bit hash over the canonical JSON of the ordered rule
    /// list (spec.md §4.7), used to invalidate stale derived fields.
    pub fn fingerprint(&self) -> String {
        let canonical =
            serde_json::to_vec(&self.0).expect("extraction rules always serialize");
        format!("{:08x}", xxhash_rust::xxh32::xxh32(&canonical, 0))
    }
}

/// Retry policy for the Scheduler's (default-off) retry path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct RetryPolicy {
    #[serde(default)]
    pub retry_on_transient_errors: bool,
}

/// `CrawlSettings` (spec.md §6.5) — the options a job submission carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    pub name: String,
    pub starting_urls: Vec<String>,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default)]
    pub allowed_regex: Vec<String>,
    #[serde(default)]
    pub denied_regex: Vec<String>,
    #[serde(default)]
    pub denied_extensions: Vec<String>,
    #[serde(default)]
    pub is_sitemap: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default)]
    pub max_pages: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: f64,
    #[serde(default = "default_true")]
    pub allow_starting_url_hostname: bool,
    #[serde(default)]
    pub allow_starting_url_tld: bool,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub extraction_rules: ExtractionRules,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub ai_parsing: bool,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
}

fn default_max_depth() -> u32 {
    300
}
fn default_concurrency() -> usize {
    10
}
fn default_max_retries() -> u32 {
    2
}
fn default_cache_ttl_hours() -> f64 {
    -1.0
}
fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    "SiteCrawler/1.0".to_string()
}
fn default_data_dir() -> String {
    "data".to_string()
}
