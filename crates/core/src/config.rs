use serde::Deserialize;

/// Ambient CLI configuration, loaded from an optional TOML file with
/// env var overrides applied by the binary at startup.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            data_dir: default_data_dir(),
            concurrency: default_concurrency(),
            max_depth: default_max_depth(),
            user_agent: default_user_agent(),
        }
    }
}

/// Endpoints and credentials for the external enrichment services
/// (§6.3 binary-text extractor, §6.4 article parser).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractionConfig {
    pub binary_text_endpoint: Option<String>,
    pub article_parser_endpoint: Option<String>,
    pub article_parser_api_key: Option<String>,
}

fn default_data_dir() -> String {
    "data".to_string()
}
fn default_concurrency() -> usize {
    10
}
fn default_max_depth() -> u32 {
    300
}
fn default_user_agent() -> String {
    "SiteCrawler/1.0".to_string()
}
