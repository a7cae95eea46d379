use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use crate::ordering::OrderingStack;

/// Serialization category for a request.
///
/// Unauthenticated (no-cookie) requests must never wait behind authenticated
/// ones, and the portal tolerates a read overlapping one in-flight write but
/// not two writes, so GET and POST get independent slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestCategory {
    NoCookie,
    Get,
    Post,
}

struct DomainStacks {
    no_cookie: OrderingStack,
    get: OrderingStack,
    post: OrderingStack,
}

impl DomainStacks {
    fn new() -> Self {
        Self {
            no_cookie: OrderingStack::new(),
            get: OrderingStack::new(),
            post: OrderingStack::new(),
        }
    }

    fn stack(&self, category: RequestCategory) -> &OrderingStack {
        match category {
            RequestCategory::NoCookie => &self.no_cookie,
            RequestCategory::Get => &self.get,
            RequestCategory::Post => &self.post,
        }
    }
}

/// Registry of per-destination-domain ordering stacks, created lazily on
/// first use and kept for the session's lifetime.
#[derive(Default)]
pub struct RequestStackRegistry {
    domains: Mutex<HashMap<String, DomainStacks>>,
}

impl RequestStackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack_for(&self, domain: &str, category: RequestCategory) -> OrderingStack {
        let mut domains = self.domains.lock().unwrap();
        domains
            .entry(domain.to_string())
            .or_insert_with(|| {
                debug!("ordering: first request for domain {domain}");
                DomainStacks::new()
            })
            .stack(category)
            .clone()
    }

    /// Drain every domain's stacks, dropping pending entries. Used on logout.
    pub fn close(&self) {
        let mut domains = self.domains.lock().unwrap();
        for stacks in domains.values() {
            stacks.no_cookie.close();
            stacks.get.close();
            stacks.post.close();
        }
        domains.clear();
    }
}
