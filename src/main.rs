mod browse;
mod cli;
mod crawl;
mod lock;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use sitecrawler_core::config::CliConfig;
use sitecrawler_core::CrawlSettings;
use sitecrawler_extract::{run_extraction_pass, HttpArticleParser, HttpBinaryTextExtractor};
use sitecrawler_store::DocumentStore;

use crate::cli::{Cli, Commands};
use crate::crawl::run_crawl;
use crate::lock::CrawlLock;

fn main() -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

fn load_cli_config(path: &str) -> CliConfig {
    match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw).unwrap_or_else(|e| {
            warn!(path, error = %e, "failed to parse config file, using defaults");
            CliConfig::default()
        }),
        Err(_) => {
            warn!(path, "config file not found, using defaults");
            CliConfig::default()
        }
    }
}

fn load_settings(path: &str) -> Result<CrawlSettings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading crawl settings from {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing crawl settings from {path}"))
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_cli_config(&cli.config);

    match cli.command {
        Commands::Crawl { settings } => {
            let settings = load_settings(&settings)?;
            let _lock = CrawlLock::acquire(&settings.name)?;
            let store = Arc::new(DocumentStore::open(
                Path::new(&settings.data_dir),
                &settings.name,
            )?);
            let reporter = run_crawl(
                settings,
                store,
                Arc::new(sitecrawler_core::NoopProgressSink),
            )
            .await?;
            let report = reporter.report();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Extract { settings } => {
            let settings = load_settings(&settings)?;
            let store = DocumentStore::open(Path::new(&settings.data_dir), &settings.name)?;

            let binary_extractor = config
                .extraction
                .binary_text_endpoint
                .as_ref()
                .map(HttpBinaryTextExtractor::new);
            let article_parser = match (
                &config.extraction.article_parser_endpoint,
                &config.extraction.article_parser_api_key,
            ) {
                (Some(endpoint), Some(api_key)) => {
                    Some(HttpArticleParser::new(endpoint.clone(), api_key.clone()))
                }
                _ => None,
            };

            let summary = run_extraction_pass(
                &store,
                &settings.extraction_rules,
                settings.ai_parsing,
                binary_extractor
                    .as_ref()
                    .map(|e| e as &dyn sitecrawler_extract::BinaryTextExtractor),
                article_parser
                    .as_ref()
                    .map(|p| p as &dyn sitecrawler_extract::ArticleParser),
            )
            .await?;
            println!("{summary:?}");
        }
        Commands::Browse {
            name,
            data_dir,
            page,
            rows,
            fullcontent,
        } => {
            let store = DocumentStore::open(Path::new(&data_dir), &name)?;
            let result = browse::browse(&store, &name, page, rows, fullcontent)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Report { name, data_dir } => {
            let store = DocumentStore::open(Path::new(&data_dir), &name)?;
            let keys = store.filter_records_by_field(
                "type",
                &serde_json::Value::String("content".to_string()),
            )?;
            println!(
                "{}",
                serde_json::json!({ "name": name, "content_records": keys.len() })
            );
        }
    }

    Ok(())
}
