use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use http::HeaderMap;
use log::{debug, trace};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::RequestFingerprint;
use crate::page::Page;

/// One cached successful response, keyed by the exact request fingerprint.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub fingerprint: RequestFingerprint,
    /// Headers the request was sent with (cookie header included).
    pub request_headers: HeaderMap,
    pub page: Page,
    created_at: Instant,
}

impl CachedPage {
    pub fn new(fingerprint: RequestFingerprint, request_headers: HeaderMap, page: Page) -> Self {
        Self {
            fingerprint,
            request_headers,
            page,
            created_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

struct CacheInner {
    entries: VecDeque<CachedPage>,
    sweeper: Option<JoinHandle<()>>,
}

/// Bounded, time-expiring store of recent pages.
///
/// Holds at most `capacity` entries, oldest evicted first. A sweeper task is
/// started lazily on the first insert and shuts itself down once the cache
/// empties, so a quiescent session owns no background work. The cache does
/// not special-case status codes; the orchestrator only feeds it 200s.
pub struct PageCache {
    inner: Arc<Mutex<CacheInner>>,
    ttl: Duration,
    sweep_interval: Duration,
    capacity: usize,
}

impl PageCache {
    pub fn new(ttl: Duration, sweep_interval: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: VecDeque::new(),
                sweeper: None,
            })),
            ttl,
            sweep_interval,
            capacity,
        }
    }

    /// Structural lookup. Expired entries never match, even between sweeps.
    pub fn get_page(&self, fingerprint: &RequestFingerprint) -> Option<CachedPage> {
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .iter()
            .find(|entry| &entry.fingerprint == fingerprint && entry.age() <= self.ttl)
            .cloned()
    }

    /// Insert or replace, evicting the oldest entry on overflow. Must be
    /// called from within a tokio runtime (the sweeper is spawned here).
    pub fn store_page(&self, page: CachedPage) {
        let mut inner = self.inner.lock().unwrap();

        inner.entries.retain(|entry| entry.fingerprint != page.fingerprint);
        inner.entries.push_back(page);
        while inner.entries.len() > self.capacity {
            inner.entries.pop_front();
            trace!("page cache: evicted oldest entry (capacity {})", self.capacity);
        }

        if inner.sweeper.is_none() {
            inner.sweeper = Some(spawn_sweeper(
                Arc::downgrade(&self.inner),
                self.ttl,
                self.sweep_interval,
            ));
        }
    }

    /// Stop the sweeper and drop every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(handle) = inner.sweeper.take() {
            handle.abort();
        }
        inner.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn sweeper_running(&self) -> bool {
        self.inner.lock().unwrap().sweeper.is_some()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }
}

impl Drop for PageCache {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(handle) = inner.sweeper.take() {
                handle.abort();
            }
        }
    }
}

fn spawn_sweeper(
    inner: Weak<Mutex<CacheInner>>,
    ttl: Duration,
    sweep_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // the first tick completes immediately

        loop {
            ticker.tick().await;

            let Some(strong) = inner.upgrade() else {
                return;
            };
            let mut guard = strong.lock().unwrap();
            let before = guard.entries.len();
            guard.entries.retain(|entry| entry.age() <= ttl);
            if guard.entries.len() != before {
                debug!(
                    "page cache: swept {} expired entries",
                    before - guard.entries.len()
                );
            }

            if guard.entries.is_empty() {
                // Quiescent cache keeps no timer alive; the next insert
                // starts a fresh sweeper.
                guard.sweeper = None;
                return;
            }
        }
    })
}
