use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method};
use log::{debug, warn};
use url::Url;

use crate::cache::{BondScopedCache, CachedPage, RequestFingerprint};
use crate::config::SessionConfig;
use crate::cookies::{CookieJar, TokenStore};
use crate::errors::SessionError;
use crate::ordering::{RequestCategory, RequestStackRegistry};
use crate::page::Page;
use crate::session::pending::{Admission, PendingRequests};
use crate::session::RequestOptions;
use crate::transport::{HttpTransport, ProgressCallback, Transport, TransportRequest};

/// The session façade.
///
/// Every logical request runs the same pipeline: cache probe, then in-flight
/// admission, then the per-(domain, category) ordering slot, cookie
/// finalization, the transport call, cookie/cache update and finally waiter
/// notification. Failures propagate to the caller untouched; this layer
/// never retries.
pub struct Session {
    shared: Arc<SessionShared>,
}

pub(crate) struct SessionShared {
    base: Url,
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    jar: Mutex<CookieJar>,
    tokens: Mutex<TokenStore>,
    cache: BondScopedCache,
    stacks: RequestStackRegistry,
    pending: PendingRequests,
    closed: AtomicBool,
}

impl Session {
    pub fn new(base: Url, config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        let cache = BondScopedCache::new(
            config.cache_ttl,
            config.sweep_interval,
            config.cache_capacity,
        );
        Self {
            shared: Arc::new(SessionShared {
                base,
                config,
                transport,
                jar: Mutex::new(CookieJar::new()),
                tokens: Mutex::new(TokenStore::new()),
                cache,
                stacks: RequestStackRegistry::new(),
                pending: PendingRequests::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Session backed by the real [`HttpTransport`].
    pub fn with_http_transport(base: Url, config: SessionConfig) -> Result<Self, SessionError> {
        Ok(Self::new(base, config, Arc::new(HttpTransport::new()?)))
    }

    /// GET a path relative to the session base URL.
    pub async fn get(&self, path: &str, options: &RequestOptions) -> Result<Page, SessionError> {
        let url = self.shared.resolve(path)?;
        self.get_url(&url, options).await
    }

    /// GET an absolute URL through the full pipeline. Bond switch URLs come
    /// in absolute, hence the separate entry point.
    pub async fn get_url(&self, url: &Url, options: &RequestOptions) -> Result<Page, SessionError> {
        let request = self.shared.build_request(Method::GET, url.clone(), None, options);
        perform_page(&self.shared, request, options).await
    }

    /// POST form fields to a path relative to the session base URL.
    pub async fn post(
        &self,
        path: &str,
        form: &[(&str, &str)],
        options: &RequestOptions,
    ) -> Result<Page, SessionError> {
        let url = self.shared.resolve(path)?;
        let request = self
            .shared
            .build_request(Method::POST, url, Some(form), options);
        perform_page(&self.shared, request, options).await
    }

    /// GET a path, streaming the body into `dest`. Downloads are never
    /// cached; cookies are still tracked. Destination problems surface
    /// before any network call.
    pub async fn download_by_get(
        &self,
        path: &str,
        dest: &Path,
        progress: Option<ProgressCallback>,
        options: &RequestOptions,
    ) -> Result<PathBuf, SessionError> {
        let url = self.shared.resolve(path)?;
        let request = self.shared.build_request(Method::GET, url, None, options);
        perform_download(&self.shared, request, dest, progress).await
    }

    /// POST variant of [`Session::download_by_get`].
    pub async fn download_by_post(
        &self,
        path: &str,
        form: &[(&str, &str)],
        dest: &Path,
        progress: Option<ProgressCallback>,
        options: &RequestOptions,
    ) -> Result<PathBuf, SessionError> {
        let url = self.shared.resolve(path)?;
        let request = self
            .shared
            .build_request(Method::POST, url, Some(form), options);
        perform_download(&self.shared, request, dest, progress).await
    }

    /// Follow `Location` hops until a non-3xx response, reusing the full
    /// request pipeline per hop. A redirect into the portal's expired-session
    /// page surfaces as [`SessionError::SessionExpired`] instead of being
    /// followed into a garbage page.
    pub async fn follow_all_redirects(&self, page: Page) -> Result<Page, SessionError> {
        let mut current = page;
        let mut hops = 0usize;

        while current.is_redirect() {
            let location = current.location().ok_or(SessionError::MissingLocation)?;
            let next = current
                .url
                .join(location)
                .map_err(|_| SessionError::InvalidPath(location.to_string()))?;

            if self
                .shared
                .config
                .expired_markers
                .iter()
                .any(|marker| next.path().contains(marker.as_str()))
            {
                debug!("session: redirect into expired-session page {next}");
                return Err(SessionError::SessionExpired(next.to_string()));
            }

            hops += 1;
            if hops > self.shared.config.max_redirects {
                return Err(SessionError::TooManyRedirects(hops));
            }

            current = self.get_url(&next, &RequestOptions::default()).await?;
        }

        Ok(current)
    }

    /// Seed the fast-path session token directly, e.g. from a login layer
    /// that obtained it out of band.
    pub fn set_session_token(&self, domain: &str, token: &str) {
        self.shared.tokens.lock().unwrap().set_token(domain, token);
    }

    /// Current fast-path session token for a domain, if any.
    pub fn session_token(&self, domain: &str) -> Option<String> {
        self.shared
            .tokens
            .lock()
            .unwrap()
            .token_for(domain)
            .map(str::to_owned)
    }

    /// Flush cookies, tokens, every identity's cache and every ordering
    /// stack. Pending entries are dropped, not completed.
    pub async fn close(&self) {
        debug!("session: closing");
        let shared = &self.shared;
        shared.closed.store(true, Ordering::SeqCst);
        shared.stacks.close();
        shared.pending.close();
        shared.jar.lock().unwrap().clear();
        shared.tokens.lock().unwrap().clear();
        shared.cache.clear_all();
    }

    pub(crate) fn cache(&self) -> &BondScopedCache {
        &self.shared.cache
    }
}

impl SessionShared {
    fn resolve(&self, path: &str) -> Result<Url, SessionError> {
        self.base
            .join(path)
            .map_err(|_| SessionError::InvalidPath(path.to_string()))
    }

    fn build_request(
        &self,
        method: Method,
        url: Url,
        form: Option<&[(&str, &str)]>,
        options: &RequestOptions,
    ) -> TransportRequest {
        let mut headers = HeaderMap::new();

        let agent = if options.mobile {
            &self.config.mobile_user_agent
        } else {
            &self.config.user_agent
        };
        if let Ok(value) = HeaderValue::from_str(agent) {
            headers.insert(USER_AGENT, value);
        }

        let body = form.map(|fields| {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
            url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields.iter())
                .finish()
                .into_bytes()
        });

        TransportRequest {
            method,
            url,
            headers,
            body,
        }
    }

    /// Cookie header for a destination: the jar first, the fast-path token
    /// store when the jar has nothing for the domain.
    fn cookie_header_for(&self, domain: &str, path: &str) -> Option<String> {
        if let Some(header) = self.jar.lock().unwrap().cookie_header(domain, path) {
            return Some(header);
        }
        self.tokens
            .lock()
            .unwrap()
            .token_for(domain)
            .map(|token| format!("{}={}", self.config.session_cookie_name, token))
    }

    fn category_for(&self, domain: &str, path: &str, method: &Method) -> RequestCategory {
        if self.cookie_header_for(domain, path).is_none() {
            RequestCategory::NoCookie
        } else if *method == Method::GET {
            RequestCategory::Get
        } else {
            RequestCategory::Post
        }
    }

    fn finalize_cookie_header(&self, domain: &str, request: &mut TransportRequest) {
        if let Some(cookie) = self.cookie_header_for(domain, request.url.path()) {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    request.headers.insert(COOKIE, value);
                }
                Err(_) => warn!("session: unrenderable cookie header for {domain}"),
            }
        }
    }

    /// Store `Set-Cookie` headers and keep the fast-path token in sync with
    /// the portal's primary session cookie.
    fn absorb_cookies(&self, domain: &str, path: &str, headers: &HeaderMap) {
        let set_cookies: Vec<String> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok().map(str::to_owned))
            .collect();
        if set_cookies.is_empty() {
            return;
        }

        let mut jar = self.jar.lock().unwrap();
        jar.store_cookies(domain, &set_cookies);
        if let Some(token) = jar.cookie_value(domain, path, &self.config.session_cookie_name) {
            self.tokens.lock().unwrap().set_token(domain, &token);
        }
    }

    /// The transport call plus its bookkeeping; runs inside an ordering slot.
    async fn dispatch(
        &self,
        mut request: TransportRequest,
        fingerprint: &RequestFingerprint,
    ) -> Result<Page, SessionError> {
        let domain = request.url.host_str().unwrap_or_default().to_string();
        self.finalize_cookie_header(&domain, &mut request);

        let request_headers = request.headers.clone();
        let url = request.url.clone();
        let path = url.path().to_string();

        let response = self.transport.exchange(request).await?;

        // A dispatch that already held its slot when close() ran still
        // completes, but must not repopulate the flushed jar or cache.
        let closing = self.closed.load(Ordering::SeqCst);
        if !closing {
            self.absorb_cookies(&domain, &path, &response.headers);
        }

        let page = Page {
            url,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body: response.body,
        };

        if page.status == 200 && !closing {
            self.cache.store_page(CachedPage::new(
                fingerprint.clone(),
                request_headers,
                page.clone(),
            ));
        }

        Ok(page)
    }
}

async fn perform_page(
    shared: &Arc<SessionShared>,
    request: TransportRequest,
    options: &RequestOptions,
) -> Result<Page, SessionError> {
    if shared.closed.load(Ordering::SeqCst) {
        return Err(SessionError::Closed);
    }

    let fingerprint = RequestFingerprint::new(
        &request.method,
        &request.url,
        &request.headers,
        request.body.as_deref(),
    );

    if !options.no_cache {
        if let Some(hit) = shared.cache.get_page(&fingerprint) {
            debug!("session: cache hit for {}", request.url);
            return Ok(hit.page);
        }
    }

    match shared.pending.admit(&fingerprint, options.share_same_request) {
        Admission::Joined(waiter) => {
            return waiter.await.map_err(|_| SessionError::Closed)?;
        }
        Admission::Lead => {}
    }

    let domain = request.url.host_str().unwrap_or_default().to_string();
    let category = shared.category_for(&domain, request.url.path(), &request.method);
    let stack = shared.stacks.stack_for(&domain, category);

    let job_shared = shared.clone();
    let job_fingerprint = fingerprint.clone();
    let outcome = match stack
        .run(async move { job_shared.dispatch(request, &job_fingerprint).await })
        .await
    {
        Ok(result) => result,
        Err(closed) => Err(closed),
    };

    shared.pending.resolve(&fingerprint, &outcome);
    outcome
}

async fn perform_download(
    shared: &Arc<SessionShared>,
    request: TransportRequest,
    dest: &Path,
    progress: Option<ProgressCallback>,
) -> Result<PathBuf, SessionError> {
    if shared.closed.load(Ordering::SeqCst) {
        return Err(SessionError::Closed);
    }

    validate_destination(dest).await?;

    let domain = request.url.host_str().unwrap_or_default().to_string();
    let category = shared.category_for(&domain, request.url.path(), &request.method);
    let stack = shared.stacks.stack_for(&domain, category);

    let job_shared = shared.clone();
    let dest = dest.to_path_buf();
    match stack
        .run(async move {
            let mut request = request;
            let domain = request.url.host_str().unwrap_or_default().to_string();
            job_shared.finalize_cookie_header(&domain, &mut request);
            let path = request.url.path().to_string();

            let response = job_shared.transport.download(request, &dest, progress).await?;
            job_shared.absorb_cookies(&domain, &path, &response.headers);

            Ok::<PathBuf, SessionError>(dest)
        })
        .await
    {
        Ok(result) => result,
        Err(closed) => Err(closed),
    }
}

/// Destination checks that must fail before any network traffic: the parent
/// directory has to exist and the target must not be a directory.
async fn validate_destination(dest: &Path) -> Result<(), SessionError> {
    if let Ok(meta) = tokio::fs::metadata(dest).await {
        if meta.is_dir() {
            return Err(SessionError::DownloadDestination(format!(
                "{} is a directory",
                dest.display()
            )));
        }
    }

    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Ok(()), // bare relative file name, current directory
    };
    match tokio::fs::metadata(parent).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SessionError::DownloadDestination(format!(
            "{} is not a directory",
            parent.display()
        ))),
        Err(e) => Err(SessionError::DownloadDestination(format!(
            "{}: {e}",
            parent.display()
        ))),
    }
}
