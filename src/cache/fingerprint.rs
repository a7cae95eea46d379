use http::{HeaderMap, Method};
use url::Url;

/// Canonical structural key for one logical request: method, URL, sorted
/// header pairs and body. Two requests are "the same" only if all of these
/// match exactly. Used both for cache lookup and for collapsing identical
/// in-flight requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl RequestFingerprint {
    pub fn new(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> Self {
        let mut pairs: Vec<(String, String)> = headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        pairs.sort();

        Self {
            method: method.as_str().to_string(),
            url: url.to_string(),
            headers: pairs,
            body: body.map(<[u8]>::to_vec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        "https://portal.example/home".parse().unwrap()
    }

    #[test]
    fn header_order_does_not_matter() {
        let mut a = HeaderMap::new();
        a.insert("x-one", "1".parse().unwrap());
        a.insert("x-two", "2".parse().unwrap());

        let mut b = HeaderMap::new();
        b.insert("x-two", "2".parse().unwrap());
        b.insert("x-one", "1".parse().unwrap());

        assert_eq!(
            RequestFingerprint::new(&Method::GET, &url(), &a, None),
            RequestFingerprint::new(&Method::GET, &url(), &b, None),
        );
    }

    #[test]
    fn any_field_difference_misses() {
        let headers = HeaderMap::new();
        let base = RequestFingerprint::new(&Method::GET, &url(), &headers, None);

        assert_ne!(
            base,
            RequestFingerprint::new(&Method::POST, &url(), &headers, None)
        );
        assert_ne!(
            base,
            RequestFingerprint::new(
                &Method::GET,
                &"https://portal.example/other".parse().unwrap(),
                &headers,
                None
            )
        );
        assert_ne!(
            base,
            RequestFingerprint::new(&Method::GET, &url(), &headers, Some(b"a=1"))
        );

        let mut extra = HeaderMap::new();
        extra.insert("x-one", "1".parse().unwrap());
        assert_ne!(
            base,
            RequestFingerprint::new(&Method::GET, &url(), &extra, None)
        );
    }

    #[test]
    fn body_bytes_must_match_exactly() {
        let headers = HeaderMap::new();
        let a = RequestFingerprint::new(&Method::POST, &url(), &headers, Some(b"a=1"));
        let b = RequestFingerprint::new(&Method::POST, &url(), &headers, Some(b"a=2"));
        assert_ne!(a, b);
    }
}
