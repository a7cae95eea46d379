/// Errors surfaced by the session core.
///
/// The type is `Clone` on purpose: when several callers share one in-flight
/// request, a single failure has to be delivered to every waiter. Transport
/// failures therefore carry their message as a string rather than the
/// underlying error value.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(String),

    /// The server redirected into its expired-session page. Callers should
    /// re-authenticate instead of parsing whatever that page renders.
    #[error("session expired on the server (redirected to {0})")]
    SessionExpired(String),

    /// The identity-switch sequence ended on a non-200 status. The active
    /// bond is left unchanged so the next call retries the switch.
    #[error("bond switch ended with status {0}")]
    BondSwitchFailed(u16),

    #[error("redirect response carries no usable Location header")]
    MissingLocation,

    #[error("gave up following redirects after {0} hops")]
    TooManyRedirects(usize),

    #[error("invalid request path: {0}")]
    InvalidPath(String),

    /// Raised before any network call when the download target is unusable.
    #[error("bad download destination: {0}")]
    DownloadDestination(String),

    /// The session was closed while the operation was queued or in flight.
    #[error("session closed")]
    Closed,
}
