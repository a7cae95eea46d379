/// Per-call flags recognized by the session operations.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Bypass the cache probe. The response is still written to the cache.
    pub no_cache: bool,

    /// Collapse this call into an identical in-flight request if one exists.
    /// Opt-in: not every request is safe to share, e.g. form submissions
    /// whose side effects must run once per logical caller even when the
    /// bytes coincide.
    pub share_same_request: bool,

    /// Send the mobile identifying header instead of the regular one.
    pub mobile: bool,
}

impl RequestOptions {
    pub fn no_cache() -> Self {
        Self {
            no_cache: true,
            ..Self::default()
        }
    }

    pub fn shared() -> Self {
        Self {
            share_same_request: true,
            ..Self::default()
        }
    }
}
