pub mod config;
pub mod error;
pub mod report;
pub mod types;

pub use config::CliConfig;
pub use error::{CrawlError, StoreError};
pub use report::{format_duration, JobReport, JobReporter, JobStats, NoopProgressSink, ProgressSink};
pub use types::*;
