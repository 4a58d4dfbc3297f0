use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sitecrawler", about = "Bounded-depth site crawler and extractor")]
pub struct Cli {
    /// Path to the ambient CLI config file (logging/data-dir/concurrency
    /// defaults and enrichment-service endpoints).
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a crawl to completion from a job settings file.
    Crawl {
        /// Path to a `CrawlSettings` JSON file (spec.md §6.5 request body).
        settings: String,
    },
    /// Run an extraction pass over a previously crawled store.
    Extract {
        /// Path to the same `CrawlSettings` JSON file used for `crawl`
        /// (its `name`, `data_dir`, and `extraction_rules` are reused).
        settings: String,
    },
    /// Paginate a crawled store's `content` records (spec.md §6.2).
    Browse {
        /// Crawl/job name.
        name: String,

        /// Directory the store was opened under.
        #[arg(long, default_value = "data")]
        data_dir: String,

        /// Zero-based page index.
        #[arg(long, default_value = "0")]
        page: usize,

        /// Rows per page (capped below 50).
        #[arg(long)]
        rows: Option<usize>,

        /// Include the full `_content` field.
        #[arg(long)]
        fullcontent: bool,
    },
    /// Print the stats/duration report of a completed crawl.
    Report {
        /// Crawl/job name.
        name: String,

        /// Directory the store was opened under.
        #[arg(long, default_value = "data")]
        data_dir: String,
    },
}
