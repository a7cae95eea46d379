//! Transport boundary: one HTTP exchange in, status/headers/body out.
//!
//! The session core never opens connections itself; it hands a fully
//! prepared [`TransportRequest`] to a [`Transport`] and interprets the
//! result. Redirects are *not* followed here and cookies are *not* managed
//! here; both are the orchestrator's job. Timeouts, if any, belong to the
//! transport and surface as ordinary [`SessionError::Transport`] failures.

pub mod http_client;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, Method};
use url::Url;

use crate::errors::SessionError;

pub use http_client::HttpTransport;

/// Called with (bytes written so far, total if known) while a download streams.
pub type ProgressCallback = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// One prepared HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// The received side of one exchange, fully buffered.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange and buffer the body.
    async fn exchange(&self, request: TransportRequest) -> Result<TransportResponse, SessionError>;

    /// Perform one exchange, streaming the body into `dest` instead of
    /// buffering it. The returned response carries headers and status only.
    async fn download(
        &self,
        request: TransportRequest,
        dest: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<TransportResponse, SessionError>;
}
