use thiserror::Error;

/// Error kinds surfaced by the Fetcher and normalised by the Scheduler.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("http status {0}")]
    HttpStatus(u16),

    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    #[error("already fetched: {0}")]
    AlreadyFetched(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Exception(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CrawlError {
    /// True for outcomes the Scheduler treats as non-errors (not logged, not counted).
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            CrawlError::InvalidContentType(_) | CrawlError::AlreadyFetched(_)
        )
    }

    /// The symbolic/numeric tag used by the Job Reporter's per-error-tag counters
    /// and by `log_error_url`.
    pub fn tag(&self) -> String {
        match self {
            CrawlError::Timeout(_) => "timeout".to_string(),
            CrawlError::ConnectionError(_) => "connection_error".to_string(),
            CrawlError::TooManyRedirects => "too_many_redirects".to_string(),
            CrawlError::InvalidEncoding(_) => "invalid_encoding".to_string(),
            CrawlError::HttpStatus(code) => code.to_string(),
            CrawlError::InvalidContentType(_) => "invalid_content_type".to_string(),
            CrawlError::AlreadyFetched(_) => "already_fetched".to_string(),
            CrawlError::InvalidUrl(_) => "invalid_url".to_string(),
            CrawlError::Exception(_) | CrawlError::Other(_) => "exception".to_string(),
        }
    }
}

/// Errors raised by the Document Store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store exhausted after {0} grow attempts")]
    Exhausted(u32),
}
