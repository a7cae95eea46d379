use std::collections::HashMap;

/// Single-value-per-domain store for the portal's primary session cookie.
///
/// The full [`CookieJar`](super::CookieJar) is the wired cookie model; this
/// store is the fast path beside it. The orchestrator seeds it from every
/// response carrying the configured session cookie, and a login layer may
/// seed it directly before the jar has seen any traffic.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: HashMap<String, String>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_for(&self, domain: &str) -> Option<&str> {
        self.tokens.get(domain).map(String::as_str)
    }

    pub fn set_token(&mut self, domain: &str, token: &str) {
        self.tokens.insert(domain.to_string(), token.to_string());
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}
