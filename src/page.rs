//! Buffered page model handed to callers.
//!
//! A [`Page`] is the fully received response for one logical request: final
//! URL, status code + reason, headers, and the raw body bytes. The session
//! core never interprets the body; convert it with [`Page::text`] or parse it
//! in the page-specific layer.

use http::HeaderMap;
use std::borrow::Cow;
use url::Url;

/// One received response, as-is. `headers` is case-insensitive for names.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// URL the request was issued against.
    pub url: Url,

    /// Numeric HTTP status code (e.g., `200`, `302`).
    pub status: u16,

    /// Reason phrase; `"Unknown"` for non-standard codes.
    pub status_text: String,

    /// Response headers.
    pub headers: HeaderMap,

    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl Page {
    /// Lossy UTF-8 view of the body.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Whether this is a 3xx response.
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// The `Location` header, if present and readable.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(http::header::LOCATION)?.to_str().ok()
    }
}
