use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

/// Hook for pushing progress updates to an external task tracker after
/// each fetch/cache hit (spec.md §4.8). No-op by default.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update(&self, _stats: &JobStats) {}
}

pub struct NoopProgressSink;

#[async_trait]
impl ProgressSink for NoopProgressSink {
    async fn update(&self, _stats: &JobStats) {}
}

/// Monotonic counters for a single crawl (spec.md §4.8).
#[derive(Debug, Default)]
pub struct JobStats {
    pub total: AtomicU64,
    pub cached: AtomicU64,
    pub cached_redirects: AtomicU64,
    pub fetched: AtomicU64,
    pub new_or_updated: AtomicU64,
    error_tags: Mutex<HashMap<String, u64>>,
}

impl JobStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_cached(&self) {
        self.cached.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_cached_redirects(&self) {
        self.cached_redirects.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_new_or_updated(&self) {
        self.new_or_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_error(&self, tag: &str) {
        let mut tags = self.error_tags.lock().expect("error_tags mutex poisoned");
        *tags.entry(tag.to_string()).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        let mut out = HashMap::new();
        out.insert("total".to_string(), self.total.load(Ordering::Relaxed));
        out.insert("cached".to_string(), self.cached.load(Ordering::Relaxed));
        out.insert(
            "cached_redirects".to_string(),
            self.cached_redirects.load(Ordering::Relaxed),
        );
        out.insert("fetched".to_string(), self.fetched.load(Ordering::Relaxed));
        out.insert(
            "new_or_updated".to_string(),
            self.new_or_updated.load(Ordering::Relaxed),
        );
        for (tag, count) in self.error_tags.lock().expect("error_tags mutex poisoned").iter() {
            out.insert(tag.clone(), *count);
        }
        out
    }
}

#[derive(Debug, Serialize)]
pub struct JobReport {
    pub name: String,
    pub stats: HashMap<String, u64>,
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
}

/// Tracks the lifetime of one crawl job and produces `JobReport`s.
pub struct JobReporter {
    pub name: String,
    pub stats: JobStats,
    start_time: chrono::DateTime<chrono::Utc>,
    end_time: Mutex<Option<chrono::DateTime<chrono::Utc>>>,
}

impl JobReporter {
    pub fn new(name: impl Into<String>) -> Self {
        JobReporter {
            name: name.into(),
            stats: JobStats::new(),
            start_time: chrono::Utc::now(),
            end_time: Mutex::new(None),
        }
    }

    pub fn finish(&self) {
        let mut end = self.end_time.lock().expect("end_time mutex poisoned");
        if end.is_none() {
            *end = Some(chrono::Utc::now());
        }
    }

    pub fn report(&self) -> JobReport {
        let end = *self.end_time.lock().expect("end_time mutex poisoned");
        let (end_time_str, duration) = match end {
            Some(end) => (
                end.to_rfc3339(),
                format_duration((end - self.start_time).num_seconds().max(0) as u64),
            ),
            None => (
                "still running".to_string(),
                format_duration(
                    (chrono::Utc::now() - self.start_time).num_seconds().max(0) as u64,
                ),
            ),
        };
        JobReport {
            name: self.name.clone(),
            stats: self.stats.snapshot(),
            start_time: self.start_time.to_rfc3339(),
            end_time: end_time_str,
            duration,
        }
    }
}

/// Formats a duration in years/days/hours/minutes/seconds, matching the
/// original crawler's human-readable report output.
pub fn format_duration(total_seconds: u64) -> String {
    if total_seconds < 1 {
        return "less than a second".to_string();
    }

    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;
    const YEAR: u64 = 365 * DAY;

    let mut remaining = total_seconds;
    let years = remaining / YEAR;
    remaining %= YEAR;
    let days = remaining / DAY;
    remaining %= DAY;
    let hours = remaining / HOUR;
    remaining %= HOUR;
    let minutes = remaining / MINUTE;
    let seconds = remaining % MINUTE;

    let mut parts = Vec::new();
    if years > 0 {
        parts.push(pluralize(years, "year"));
    }
    if days > 0 {
        parts.push(pluralize(days, "day"));
    }
    if hours > 0 {
        parts.push(pluralize(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(pluralize(minutes, "minute"));
    }
    if seconds > 0 {
        parts.push(pluralize(seconds, "second"));
    }

    match parts.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}

fn pluralize(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_duration() {
        assert_eq!(format_duration(0), "less than a second");
    }

    #[test]
    fn mixed_units() {
        let secs = 2 * 24 * 3600 + 3 * 3600 + 4 * 60 + 5;
        assert_eq!(format_duration(secs), "2 days, 3 hours, 4 minutes and 5 seconds");
    }

    #[test]
    fn two_units_joined_with_and() {
        assert_eq!(format_duration(3 * 60 + 5), "3 minutes and 5 seconds");
    }

    #[test]
    fn singular_units() {
        assert_eq!(format_duration(1), "1 second");
        assert_eq!(format_duration(60), "1 minute");
    }

    #[test]
    fn job_stats_snapshot_contains_counters() {
        let stats = JobStats::new();
        stats.incr_total();
        stats.incr_fetched();
        stats.incr_error("timeout");
        stats.incr_error("timeout");
        let snap = stats.snapshot();
        assert_eq!(snap["total"], 1);
        assert_eq!(snap["fetched"], 1);
        assert_eq!(snap["timeout"], 2);
    }
}
