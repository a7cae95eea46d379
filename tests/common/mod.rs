use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::HeaderMap;

use portal_session::{
    ProgressCallback, SessionError, Transport, TransportRequest, TransportResponse,
};

type Handler =
    Box<dyn Fn(&TransportRequest) -> Result<TransportResponse, SessionError> + Send + Sync>;

/// Scripted transport for end-to-end tests: routes by request, records calls.
pub struct ScriptedTransport {
    handler: Handler,
    latency: Duration,
    calls: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&TransportRequest) -> Result<TransportResponse, SessionError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_latency(
        latency: Duration,
        handler: impl Fn(&TransportRequest) -> Result<TransportResponse, SessionError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            latency,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call(&self, index: usize) -> TransportRequest {
        self.calls.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exchange(&self, request: TransportRequest) -> Result<TransportResponse, SessionError> {
        self.calls.lock().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.handler)(&request)
    }

    async fn download(
        &self,
        request: TransportRequest,
        dest: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<TransportResponse, SessionError> {
        self.calls.lock().unwrap().push(request.clone());
        let response = (self.handler)(&request)?;
        tokio::fs::write(dest, &response.body)
            .await
            .map_err(|e| SessionError::DownloadDestination(e.to_string()))?;
        if let Some(callback) = &progress {
            callback(response.body.len() as u64, Some(response.body.len() as u64));
        }
        Ok(TransportResponse {
            body: Vec::new(),
            ..response
        })
    }
}

pub fn response(
    status: u16,
    headers: &[(&str, &str)],
    body: &str,
) -> Result<TransportResponse, SessionError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(
            http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            value.parse().unwrap(),
        );
    }
    Ok(TransportResponse {
        status,
        status_text: String::new(),
        headers: map,
        body: body.as_bytes().to_vec(),
    })
}

pub fn ok(body: &str) -> Result<TransportResponse, SessionError> {
    response(200, &[], body)
}
