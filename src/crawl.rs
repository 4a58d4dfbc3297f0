//! Crawl Scheduler orchestration (spec.md §4.5/§4.6): N cooperative
//! workers share one `Frontier`, one `Fetcher`, and one `DocumentStore`.
//! Completion is observed by awaiting the frontier's drain.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use sitecrawler_core::{CrawlError, CrawlSettings, FetchConfig, JobReporter, ProgressSink, QMsg};
use sitecrawler_fetch::{FetchBody, Fetcher};
use sitecrawler_frontier::Frontier;
use sitecrawler_parser::{extract_links, ScopeFilter};
use sitecrawler_store::DocumentStore;

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// `is_cached_url`: a `cache_ttl_hours < 0` policy never expires a cached
/// `content` record; otherwise it expires once its age exceeds the TTL
/// (spec.md §8 scenarios 9-10).
fn is_cache_valid(crawled: f64, cache_ttl_hours: f64) -> bool {
    if cache_ttl_hours < 0.0 {
        return true;
    }
    (now_secs() - crawled) / 3600.0 < cache_ttl_hours
}

/// What the caching layer or the fetcher produced for one URL, ready to
/// feed into link extraction and the output step.
struct Resolved {
    content_type: String,
    final_url: String,
    html_body: Option<String>,
    server_last_modified: Option<String>,
    /// `false` for a cache hit, where nothing needs to be (re)written.
    freshly_fetched: bool,
}

/// Before-fetch cache lookup (spec.md §4.6): a `content` hit returns the
/// stored body directly; a `redirect` hit follows once to its target's
/// stored `content` record.
fn cache_lookup(store: &DocumentStore, url: &str, cache_ttl_hours: f64) -> Result<Option<Resolved>> {
    let Some(record) = store.get_record(url)? else {
        return Ok(None);
    };
    match record.get("type").and_then(|v| v.as_str()) {
        Some("content") => {
            let crawled = record.get("crawled").and_then(|v| v.as_f64()).unwrap_or(0.0);
            if !is_cache_valid(crawled, cache_ttl_hours) {
                return Ok(None);
            }
            Ok(Some(Resolved {
                content_type: record
                    .get("content_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                final_url: url.to_string(),
                html_body: record.get("_content").and_then(|v| v.as_str()).map(str::to_string),
                server_last_modified: record
                    .get("server_last_modified")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                freshly_fetched: false,
            }))
        }
        Some("redirect") => {
            let target = record
                .get("redirected_url")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let Some(target_record) = store.get_record(&target)? else {
                return Ok(None);
            };
            if target_record.get("type").and_then(|v| v.as_str()) != Some("content") {
                return Ok(None);
            }
            let crawled = target_record.get("crawled").and_then(|v| v.as_f64()).unwrap_or(0.0);
            if !is_cache_valid(crawled, cache_ttl_hours) {
                return Ok(None);
            }
            Ok(Some(Resolved {
                content_type: target_record
                    .get("content_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                final_url: target,
                html_body: target_record.get("_content").and_then(|v| v.as_str()).map(str::to_string),
                server_last_modified: target_record
                    .get("server_last_modified")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                freshly_fetched: false,
            }))
        }
        _ => Ok(None),
    }
}

/// After-fetch write (spec.md §4.6): records a redirect mapping if the
/// final URL moved, then writes/updates the `content` record only when
/// it's new or the server's `Last-Modified` changed.
fn store_fetch_result(
    store: &DocumentStore,
    requested_url: &str,
    outcome: &Resolved,
    bytes: Option<&[u8]>,
) -> Result<bool> {
    if outcome.final_url != requested_url {
        store.put_record(
            requested_url,
            &json!({
                "type": "redirect",
                "redirected_url": outcome.final_url,
                "crawled": now_secs(),
                "parsed_hash": "",
            }),
        )?;
    }

    let existing = store.get_record(&outcome.final_url)?;
    let existing_last_modified = existing
        .as_ref()
        .and_then(|r| r.get("server_last_modified"))
        .and_then(|v| v.as_str());
    let is_new = existing.is_none();
    let changed = outcome.server_last_modified.is_some()
        && outcome.server_last_modified.as_deref() != existing_last_modified;

    if !is_new && !changed {
        return Ok(false);
    }

    let fields = json!({
        "parsed_hash": "",
        "crawled": now_secs(),
        "server_last_modified": outcome.server_last_modified,
    });

    if outcome.content_type == "text/html" {
        store.put_html(&outcome.final_url, outcome.html_body.as_deref().unwrap_or(""), fields)?;
    } else if let Some(bytes) = bytes {
        store.put_blob(&outcome.final_url, bytes, &outcome.content_type, fields)?;
    }
    Ok(true)
}

/// Runs one worker loop to drain: pop, claim, cache-or-fetch, output,
/// enqueue children, mark done — repeated until the frontier drains
/// (spec.md §4.5 steps 1-7).
#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker_id: usize,
    frontier: Arc<Frontier>,
    fetcher: Arc<Fetcher>,
    scope: Arc<ScopeFilter>,
    store: Arc<DocumentStore>,
    reporter: Arc<JobReporter>,
    progress: Arc<dyn ProgressSink>,
    settings: Arc<CrawlSettings>,
) {
    while let Some(msg) = frontier.pop().await {
        process_message(worker_id, &msg, &frontier, &fetcher, &scope, &store, &reporter, &progress, &settings).await;
        frontier.task_done();
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_message(
    worker_id: usize,
    msg: &QMsg,
    frontier: &Frontier,
    fetcher: &Fetcher,
    scope: &ScopeFilter,
    store: &DocumentStore,
    reporter: &JobReporter,
    progress: &Arc<dyn ProgressSink>,
    settings: &CrawlSettings,
) {
    if msg.depth >= frontier.max_depth {
        return;
    }
    if frontier.is_seen(&msg.url) {
        return;
    }
    if frontier.max_pages > 0 && frontier.seen_len() as u64 > frontier.max_pages {
        return;
    }
    if !frontier.claim(&msg.url) {
        return;
    }

    reporter.stats.incr_total();

    let cached = match cache_lookup(store, &msg.url, settings.cache_ttl_hours) {
        Ok(v) => v,
        Err(e) => {
            warn!(worker_id, url = %msg.url, error = %e, "cache lookup failed, treating as miss");
            None
        }
    };

    let (resolved, bytes): (Resolved, Option<Vec<u8>>) = if let Some(resolved) = cached {
        if resolved.final_url == msg.url {
            reporter.stats.incr_cached();
        } else {
            reporter.stats.incr_cached_redirects();
        }
        let bytes = if resolved.content_type != "text/html" {
            store.get_blob(&resolved.final_url).ok().flatten()
        } else {
            None
        };
        (resolved, bytes)
    } else {
        info!(worker_id, url = %msg.url, depth = msg.depth, "fetching");
        match fetcher.fetch(&msg.url, &settings.user_agent, &settings.headers, frontier.seen_set()).await {
            Ok(outcome) => {
                reporter.stats.incr_fetched();
                let (html_body, bytes) = match outcome.body {
                    FetchBody::Html(s) => (Some(s), None),
                    FetchBody::Binary(b) => (None, Some(b)),
                };
                let resolved = Resolved {
                    content_type: outcome.content_type,
                    final_url: outcome.final_url,
                    html_body,
                    server_last_modified: outcome.headers.get("last-modified").cloned(),
                    freshly_fetched: true,
                };
                (resolved, bytes)
            }
            Err(e) => {
                handle_error(worker_id, msg, frontier, store, reporter, settings, e);
                return;
            }
        }
    };

    if resolved.freshly_fetched {
        let is_new_or_updated = match store_fetch_result(store, &msg.url, &resolved, bytes.as_deref()) {
            Ok(v) => v,
            Err(e) => {
                warn!(worker_id, url = %msg.url, error = %e, "store write failed");
                false
            }
        };
        if is_new_or_updated {
            reporter.stats.incr_new_or_updated();
        }
    }

    progress.update(&reporter.stats).await;

    if resolved.content_type != "text/html" {
        return;
    }
    let Some(html) = &resolved.html_body else { return };
    let Ok(base) = Url::parse(&resolved.final_url) else { return };

    let links = extract_links(html, &base);
    if msg.depth + 1 >= frontier.max_depth {
        return;
    }
    for link in links {
        if !scope.is_in_scope(&link) {
            continue;
        }
        frontier.push_child(resolved.final_url.clone(), link, msg.depth + 1);
    }
}

fn handle_error(
    worker_id: usize,
    msg: &QMsg,
    frontier: &Frontier,
    store: &DocumentStore,
    reporter: &JobReporter,
    settings: &CrawlSettings,
    err: CrawlError,
) {
    if err.is_silent() {
        return;
    }

    if settings.retry_policy.retry_on_transient_errors
        && matches!(err, CrawlError::Timeout(_) | CrawlError::ConnectionError(_))
        && frontier.retry(msg.clone(), settings.max_retries)
    {
        return;
    }

    let tag = err.tag();
    warn!(worker_id, url = %msg.url, tag = %tag, "{}", err);
    reporter.stats.incr_error(&tag);
    let _ = store.put_record(
        &msg.url,
        &json!({
            "type": "error",
            "error_code": tag,
            "_content": err.to_string(),
            "crawled": now_secs(),
            "parsed_hash": "",
        }),
    );
}

/// Runs one full crawl per §4.5/§4.6 to completion and returns its
/// `JobReporter` for `report()`/stats inspection.
pub async fn run_crawl(
    settings: CrawlSettings,
    store: Arc<DocumentStore>,
    progress: Arc<dyn ProgressSink>,
) -> Result<Arc<JobReporter>> {
    let scope = Arc::new(ScopeFilter::new(
        &settings.starting_urls,
        &settings.allowed_domains,
        settings.allow_starting_url_hostname,
        settings.allow_starting_url_tld,
        &settings.allowed_regex,
        &settings.denied_regex,
        &settings.denied_extensions,
    ));

    // `is_sitemap` forces max_depth=1 (spec.md §6.5/§9): seeds are fetched
    // as-is and never traversed further. Expanding a sitemap tree into
    // leaf URLs is left to the caller supplying `starting_urls` directly;
    // no crate in this workspace's stack parses sitemap XML.
    let max_depth = if settings.is_sitemap { 1 } else { settings.max_depth };
    let frontier = Arc::new(Frontier::new(max_depth, settings.max_pages));
    for url in &settings.starting_urls {
        frontier.push_seed(url.clone());
    }
    info!(name = %settings.name, count = settings.starting_urls.len(), "seeds loaded");

    let fetch_config = FetchConfig {
        timeout: std::time::Duration::from_secs(10),
        max_redirects: 30,
        user_agent: settings.user_agent.clone(),
        headers: settings.headers.clone(),
    };
    let fetcher = Arc::new(Fetcher::new(&fetch_config));
    let reporter = Arc::new(JobReporter::new(settings.name.clone()));
    let settings = Arc::new(settings);

    let mut handles = Vec::with_capacity(settings.concurrency);
    for worker_id in 0..settings.concurrency {
        let handle = tokio::spawn(worker_loop(
            worker_id,
            Arc::clone(&frontier),
            Arc::clone(&fetcher),
            Arc::clone(&scope),
            Arc::clone(&store),
            Arc::clone(&reporter),
            Arc::clone(&progress),
            Arc::clone(&settings),
        ));
        handles.push(handle);
    }

    frontier.join().await;
    for handle in handles {
        let _ = handle.await;
    }

    reporter.finish();
    info!(name = %settings.name, stats = ?reporter.stats.snapshot(), "crawl completed");
    Ok(reporter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_valid_with_negative_ttl_never_expires() {
        assert!(is_cache_valid(0.0, -1.0));
    }

    #[test]
    fn cache_expired_past_ttl() {
        let an_hour_ago = now_secs() - 3600.0;
        assert!(!is_cache_valid(an_hour_ago, 0.5));
        assert!(is_cache_valid(an_hour_ago, 2.0));
    }
}
