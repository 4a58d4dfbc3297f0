//! Crawl Scheduler state: a FIFO work queue, an atomic `seen` dedup set,
//! and join/drain accounting for a bounded worker pool (spec.md §4.5).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use dashmap::DashSet;
use sitecrawler_core::types::QMsg;
use tokio::sync::Notify;
use tracing::{debug, warn};

pub struct Frontier {
    queue: Mutex<VecDeque<QMsg>>,
    seen: DashSet<String>,
    /// Count of messages pushed but not yet marked done (queued + in-flight).
    pending: AtomicUsize,
    item_available: Notify,
    drained: Notify,
    pub max_depth: u32,
    pub max_pages: u64,
}

impl Frontier {
    pub fn new(max_depth: u32, max_pages: u64) -> Self {
        Frontier {
            queue: Mutex::new(VecDeque::new()),
            seen: DashSet::new(),
            pending: AtomicUsize::new(0),
            item_available: Notify::new(),
            drained: Notify::new(),
            max_depth,
            max_pages,
        }
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Exposes the claimed-URL set for the Fetcher's post-redirect
    /// already-fetched check (spec.md §4.2).
    pub fn seen_set(&self) -> &DashSet<String> {
        &self.seen
    }

    /// Atomic test-and-set: inserts `url` into `seen`, returning `true`
    /// iff it was not already present. This is what preserves the
    /// single-fetch-per-URL invariant on a preemptive runtime
    /// (spec.md §5).
    pub fn claim(&self, url: &str) -> bool {
        self.seen.insert(url.to_string())
    }

    fn enqueue(&self, msg: QMsg) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .expect("frontier queue mutex poisoned")
            .push_back(msg);
        self.item_available.notify_one();
    }

    pub fn push_seed(&self, url: String) {
        self.enqueue(QMsg::seed(url));
    }

    /// Enqueues a discovered link, skipping it if already claimed
    /// (`links \ seen`, spec.md §4.5 step 6). The authoritative claim
    /// still happens at dequeue time in the worker loop.
    pub fn push_child(&self, source_url: String, url: String, depth: u32) {
        if self.seen.contains(&url) {
            return;
        }
        self.enqueue(QMsg::child(source_url, url, depth));
    }

    /// Dequeues the next message, or `None` once the queue is drained
    /// (empty with no pending in-flight work).
    pub async fn pop(&self) -> Option<QMsg> {
        loop {
            if let Some(msg) = self
                .queue
                .lock()
                .expect("frontier queue mutex poisoned")
                .pop_front()
            {
                return Some(msg);
            }
            if self.pending.load(Ordering::SeqCst) == 0 {
                return None;
            }
            let notified = self.item_available.notified();
            if !self
                .queue
                .lock()
                .expect("frontier queue mutex poisoned")
                .is_empty()
            {
                continue;
            }
            if self.pending.load(Ordering::SeqCst) == 0 {
                return None;
            }
            notified.await;
        }
    }

    /// Marks one message's processing complete. Must be called exactly
    /// once per `pop()`/retry-requeue, regardless of outcome
    /// (spec.md §4.5 step 7: "always mark task done").
    pub fn task_done(&self) {
        let prev = self.pending.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Awaits queue drain: all dispatched tasks marked done.
    pub async fn join(&self) {
        loop {
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            let notified = self.drained.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// `retry_task`: removes `url` from `seen` and re-enqueues at
    /// `retry_count + 1`. Disabled by default per spec.md §9 — callers
    /// gate this behind `CrawlSettings.retry_policy`. Returns `false`
    /// (and drops the task) once `retry_count >= max_retries`.
    pub fn retry(&self, msg: QMsg, max_retries: u32) -> bool {
        if msg.retry_count >= max_retries {
            warn!(url = %msg.url, "max retries exceeded, dropping");
            return false;
        }
        self.seen.remove(&msg.url);
        debug!(url = %msg.url, retry_count = msg.retry_count + 1, "retrying");
        self.enqueue(QMsg {
            retry_count: msg.retry_count + 1,
            ..msg
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pop_returns_none_once_drained() {
        let f = Frontier::new(300, 0);
        f.push_seed("http://example.com".to_string());
        let msg = f.pop().await.unwrap();
        assert_eq!(msg.url, "http://example.com");
        f.task_done();
        assert!(f.pop().await.is_none());
    }

    #[tokio::test]
    async fn claim_is_test_and_set() {
        let f = Frontier::new(300, 0);
        assert!(f.claim("http://example.com"));
        assert!(!f.claim("http://example.com"));
    }

    #[tokio::test]
    async fn push_child_skips_already_seen() {
        let f = Frontier::new(300, 0);
        f.claim("http://example.com/a");
        f.push_child(
            "http://example.com".to_string(),
            "http://example.com/a".to_string(),
            1,
        );
        assert_eq!(f.seen_len(), 1);
        let msg = f.pop().await;
        assert!(msg.is_none());
    }

    #[tokio::test]
    async fn join_waits_for_all_tasks_done() {
        let f = std::sync::Arc::new(Frontier::new(300, 0));
        f.push_seed("http://example.com/a".to_string());
        f.push_seed("http://example.com/b".to_string());

        let f2 = f.clone();
        let handle = tokio::spawn(async move {
            while let Some(_msg) = f2.pop().await {
                f2.task_done();
            }
        });

        f.join().await;
        handle.await.unwrap();
    }
}
