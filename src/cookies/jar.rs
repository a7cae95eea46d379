use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// One parsed cookie. `domain` is the host that stored it; `domain_attr` is
/// the `Domain` attribute, which widens visibility to subdomains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieEntry {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub domain_attr: Option<String>,
    pub path: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

impl CookieEntry {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires, Some(at) if at <= now)
    }

    /// Domain visibility: exact host match without a `Domain` attribute,
    /// suffix match with one.
    fn matches_domain(&self, request_domain: &str) -> bool {
        match &self.domain_attr {
            Some(attr) => {
                request_domain == attr || request_domain.ends_with(&format!(".{attr}"))
            }
            None => request_domain == self.domain,
        }
    }

    fn matches_path(&self, request_path: &str) -> bool {
        match &self.path {
            Some(path) => request_path.starts_with(path.as_str()),
            None => true,
        }
    }
}

/// In-memory cookie jar for one session. Holds cookies most-recent-first so
/// that a re-set cookie shadows older occurrences of the same name when the
/// request header is rendered. Parsing never fails: malformed attributes are
/// dropped for that cookie, forged `Domain` attributes drop the whole cookie.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CookieJar {
    entries: Vec<CookieEntry>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every `Set-Cookie` header value received from `domain` and
    /// insert the valid ones at the front of the jar.
    pub fn store_cookies(&mut self, domain: &str, set_cookie_headers: &[String]) {
        for header in set_cookie_headers {
            match parse_set_cookie(domain, header) {
                Some(cookie) => {
                    trace!("jar: stored {}={} for {}", cookie.name, cookie.value, domain);
                    self.entries.insert(0, cookie);
                }
                None => {
                    debug!("jar: rejected set-cookie {header:?} from {domain}");
                }
            }
        }
    }

    /// Render the `Cookie` header for a request to `domain` + `path`, or
    /// `None` if no stored cookie qualifies. The most recently stored
    /// occurrence wins when names collide.
    pub fn cookie_header(&self, domain: &str, path: &str) -> Option<String> {
        let now = Utc::now();
        let mut seen: Vec<&str> = Vec::new();
        let mut parts: Vec<String> = Vec::new();

        for cookie in &self.entries {
            if cookie.expired(now)
                || !cookie.matches_domain(domain)
                || !cookie.matches_path(path)
                || seen.contains(&cookie.name.as_str())
            {
                continue;
            }
            seen.push(&cookie.name);
            parts.push(format!("{}={}", cookie.name, cookie.value));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }

    /// Current value of one named cookie as visible to `domain` + `path`.
    pub fn cookie_value(&self, domain: &str, path: &str, name: &str) -> Option<String> {
        let now = Utc::now();
        self.entries
            .iter()
            .find(|c| {
                c.name == name && !c.expired(now) && c.matches_domain(domain) && c.matches_path(path)
            })
            .map(|c| c.value.clone())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the jar state, e.g. to hand a session over between runs.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries)
    }

    /// Rebuild a jar from [`CookieJar::to_json`] output.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self {
            entries: serde_json::from_str(json)?,
        })
    }
}

/// Extract the cookie-name token: stops at `;`, `,`, `=`, whitespace or
/// control characters.
fn name_token(input: &str) -> &str {
    let end = input
        .find(|c: char| c == ';' || c == ',' || c == '=' || c.is_whitespace() || c.is_control())
        .unwrap_or(input.len());
    &input[..end]
}

fn parse_set_cookie(domain: &str, header: &str) -> Option<CookieEntry> {
    let header = header.trim_start();
    let name = name_token(header);
    if name.is_empty() {
        return None;
    }
    let rest = header[name.len()..].trim_start();
    let rest = rest.strip_prefix('=')?;

    let mut segments = rest.split(';');
    let value = segments.next().unwrap_or("").trim().to_string();

    let mut cookie = CookieEntry {
        name: name.to_string(),
        value,
        domain: domain.to_ascii_lowercase(),
        domain_attr: None,
        path: None,
        expires: None,
    };
    let mut saw_max_age = false;

    for segment in segments {
        let segment = segment.trim();
        let Some((attr, val)) = segment.split_once('=') else {
            continue; // value-less attributes (Secure, HttpOnly) don't affect visibility here
        };
        let val = val.trim();
        match attr.trim().to_ascii_lowercase().as_str() {
            "path" => cookie.path = Some(val.to_string()),
            "domain" => {
                let attr_domain = val.trim_start_matches('.').to_ascii_lowercase();
                let storing = &cookie.domain;
                // A Domain attribute that is not a parent of the storing host
                // is a forged cookie; drop it entirely.
                if storing != &attr_domain && !storing.ends_with(&format!(".{attr_domain}")) {
                    return None;
                }
                cookie.domain_attr = Some(attr_domain);
            }
            "max-age" => {
                // Values outside the representable range are treated like any
                // other malformed attribute and ignored.
                let expiry = val
                    .parse::<i64>()
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .and_then(|delta| Utc::now().checked_add_signed(delta));
                if let Some(at) = expiry {
                    cookie.expires = Some(at);
                    saw_max_age = true;
                }
            }
            "expires" => {
                if !saw_max_age {
                    if let Some(at) = parse_cookie_date(val) {
                        cookie.expires = Some(at);
                    }
                }
            }
            _ => {}
        }
    }

    Some(cookie)
}

/// Cookie `Expires` dates come in the RFC 2822 shape or the older
/// dash-separated variant; anything else is ignored.
fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc2822(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%a, %d-%b-%Y %H:%M:%S GMT")
        .ok()
        .map(|naive| naive.and_utc())
}
