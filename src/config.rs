use std::time::Duration;

/// Configuration for a portal session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identifying header sent on ordinary requests.
    pub user_agent: String,
    /// Identifying header sent when a caller asks for the mobile rendering.
    pub mobile_user_agent: String,
    /// Name of the primary session cookie the portal hands out.
    pub session_cookie_name: String,
    /// How long a cached page stays servable.
    pub cache_ttl: Duration,
    /// Maximum number of pages kept per identity cache.
    pub cache_capacity: usize,
    /// How often the cache sweeper looks for expired entries.
    pub sweep_interval: Duration,
    /// Hop limit for `follow_all_redirects`.
    pub max_redirects: usize,
    /// Path fragments that mark the portal's expired-session page. A redirect
    /// whose target contains one of these surfaces as `SessionError::SessionExpired`.
    pub expired_markers: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: "PortalSession/1.0".to_string(),
            mobile_user_agent: "PortalSession/1.0 (Mobile)".to_string(),
            session_cookie_name: "JSESSIONID".to_string(),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 15,
            sweep_interval: Duration::from_secs(60),
            max_redirects: 20,
            expired_markers: vec!["expirada".to_string(), "expired".to_string()],
        }
    }
}
