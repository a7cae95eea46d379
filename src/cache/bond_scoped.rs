use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use log::debug;

use crate::cache::{CachedPage, PageCache, RequestFingerprint};

/// Identity key a cache is scoped to: the bond switch URL, or `None` for the
/// default/primary identity.
pub type BondKey = Option<String>;

struct BondCaches {
    current: BondKey,
    caches: HashMap<BondKey, PageCache>,
}

/// Multiplexes one [`PageCache`] per server-side identity.
///
/// The same URL renders different content depending on which bond is active
/// on the server, so a page cached under one identity must never be served
/// while another is active. Caches are created lazily for unseen identities.
pub struct BondScopedCache {
    inner: Mutex<BondCaches>,
    ttl: Duration,
    sweep_interval: Duration,
    capacity: usize,
}

impl BondScopedCache {
    pub fn new(ttl: Duration, sweep_interval: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BondCaches {
                current: None,
                caches: HashMap::new(),
            }),
            ttl,
            sweep_interval,
            capacity,
        }
    }

    /// Route subsequent lookups and stores to `bond`'s cache.
    pub fn set_current_bond(&self, bond: BondKey) {
        let mut inner = self.inner.lock().unwrap();
        if inner.current != bond {
            debug!("cache: active bond is now {:?}", bond);
            inner.current = bond;
        }
    }

    pub fn current_bond(&self) -> BondKey {
        self.inner.lock().unwrap().current.clone()
    }

    pub fn get_page(&self, fingerprint: &RequestFingerprint) -> Option<CachedPage> {
        let inner = self.inner.lock().unwrap();
        inner.caches.get(&inner.current)?.get_page(fingerprint)
    }

    pub fn store_page(&self, page: CachedPage) {
        let mut inner = self.inner.lock().unwrap();
        let key = inner.current.clone();
        let (ttl, interval, capacity) = (self.ttl, self.sweep_interval, self.capacity);
        inner
            .caches
            .entry(key)
            .or_insert_with(|| PageCache::new(ttl, interval, capacity))
            .store_page(page);
    }

    /// Clear every underlying cache and forget them all.
    pub fn clear_all(&self) {
        let mut inner = self.inner.lock().unwrap();
        for cache in inner.caches.values() {
            cache.clear();
        }
        inner.caches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use http::{HeaderMap, Method};
    use url::Url;

    fn fingerprint() -> RequestFingerprint {
        let url: Url = "https://portal.example/grades".parse().unwrap();
        RequestFingerprint::new(&Method::GET, &url, &HeaderMap::new(), None)
    }

    fn cached(body: &str) -> CachedPage {
        CachedPage::new(
            fingerprint(),
            HeaderMap::new(),
            Page {
                url: "https://portal.example/grades".parse().unwrap(),
                status: 200,
                status_text: "OK".into(),
                headers: HeaderMap::new(),
                body: body.as_bytes().to_vec(),
            },
        )
    }

    fn scoped() -> BondScopedCache {
        BondScopedCache::new(Duration::from_secs(300), Duration::from_secs(60), 15)
    }

    #[tokio::test]
    async fn pages_never_cross_identity_boundaries() {
        let cache = scoped();

        cache.store_page(cached("primary"));
        assert_eq!(cache.get_page(&fingerprint()).unwrap().page.body, b"primary");

        cache.set_current_bond(Some("https://portal.example/switch/2".into()));
        assert!(cache.get_page(&fingerprint()).is_none());

        cache.store_page(cached("second"));
        assert_eq!(cache.get_page(&fingerprint()).unwrap().page.body, b"second");

        // Switching back restores visibility of the first identity's entries.
        cache.set_current_bond(None);
        assert_eq!(cache.get_page(&fingerprint()).unwrap().page.body, b"primary");
    }

    #[tokio::test]
    async fn clear_all_forgets_every_identity() {
        let cache = scoped();
        cache.store_page(cached("primary"));
        cache.set_current_bond(Some("b".into()));
        cache.store_page(cached("second"));

        cache.clear_all();

        assert!(cache.get_page(&fingerprint()).is_none());
        cache.set_current_bond(None);
        assert!(cache.get_page(&fingerprint()).is_none());
    }
}
