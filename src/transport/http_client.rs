use std::path::Path;

use async_trait::async_trait;
use log::trace;
use tokio::io::AsyncWriteExt;

use crate::errors::SessionError;
use crate::transport::{ProgressCallback, Transport, TransportRequest, TransportResponse};

/// reqwest-backed [`Transport`].
///
/// Built with redirects disabled (the orchestrator follows them itself, one
/// hop at a time) and without reqwest's cookie store (the session owns its
/// own jar).
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    async fn send(&self, request: TransportRequest) -> Result<reqwest::Response, SessionError> {
        trace!("transport: {} {}", request.method, request.url);
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, request: TransportRequest) -> Result<TransportResponse, SessionError> {
        let response = self.send(request).await?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?
            .to_vec();

        Ok(TransportResponse {
            status,
            status_text,
            headers,
            body,
        })
    }

    async fn download(
        &self,
        request: TransportRequest,
        dest: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<TransportResponse, SessionError> {
        let mut response = self.send(request).await?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();
        let headers = response.headers().clone();
        let total = response.content_length();

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| SessionError::DownloadDestination(e.to_string()))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| SessionError::DownloadDestination(e.to_string()))?;
            written += chunk.len() as u64;
            if let Some(callback) = &progress {
                callback(written, total);
            }
        }
        file.flush()
            .await
            .map_err(|e| SessionError::DownloadDestination(e.to_string()))?;
        trace!("transport: wrote {written} bytes to {}", dest.display());

        Ok(TransportResponse {
            status,
            status_text,
            headers,
            body: Vec::new(),
        })
    }
}
