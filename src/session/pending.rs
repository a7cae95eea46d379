use std::collections::HashMap;
use std::sync::Mutex;

use log::trace;
use tokio::sync::oneshot;

use crate::cache::RequestFingerprint;
use crate::errors::SessionError;
use crate::page::Page;

type Outcome = Result<Page, SessionError>;

/// Registry of in-flight requests, keyed by fingerprint.
///
/// The first caller for a fingerprint becomes the lead and must call
/// [`PendingRequests::resolve`] exactly once with the outcome; callers that
/// opted into sharing join the lead's flight and receive a clone of that
/// outcome instead of issuing a second network call.
#[derive(Default)]
pub struct PendingRequests {
    inflight: Mutex<HashMap<RequestFingerprint, Vec<oneshot::Sender<Outcome>>>>,
}

pub enum Admission {
    /// Caller executes the request and resolves the entry afterwards.
    Lead,
    /// Caller awaits the identical in-flight request instead.
    Joined(oneshot::Receiver<Outcome>),
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&self, fingerprint: &RequestFingerprint, share: bool) -> Admission {
        let mut inflight = self.inflight.lock().unwrap();
        if share {
            if let Some(waiters) = inflight.get_mut(fingerprint) {
                trace!("pending: joining an identical in-flight request");
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                return Admission::Joined(rx);
            }
        }
        inflight.entry(fingerprint.clone()).or_default();
        Admission::Lead
    }

    /// Deliver `outcome` to every joined waiter and forget the entry.
    pub fn resolve(&self, fingerprint: &RequestFingerprint, outcome: &Outcome) {
        let waiters = self.inflight.lock().unwrap().remove(fingerprint);
        if let Some(waiters) = waiters {
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }

    /// Drop every entry; joined waiters observe [`SessionError::Closed`].
    pub fn close(&self) {
        self.inflight.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method};
    use url::Url;

    fn fingerprint() -> RequestFingerprint {
        let url: Url = "https://portal.example/home".parse().unwrap();
        RequestFingerprint::new(&Method::GET, &url, &HeaderMap::new(), None)
    }

    fn page() -> Page {
        Page {
            url: "https://portal.example/home".parse().unwrap(),
            status: 200,
            status_text: "OK".into(),
            headers: HeaderMap::new(),
            body: b"home".to_vec(),
        }
    }

    #[tokio::test]
    async fn sharing_joins_the_lead_flight() {
        let pending = PendingRequests::new();
        let fp = fingerprint();

        assert!(matches!(pending.admit(&fp, true), Admission::Lead));
        let Admission::Joined(rx) = pending.admit(&fp, true) else {
            panic!("second identical shared request must join");
        };

        pending.resolve(&fp, &Ok(page()));
        assert_eq!(rx.await.unwrap().unwrap().body, b"home");
    }

    #[tokio::test]
    async fn failures_fan_out_to_every_waiter() {
        let pending = PendingRequests::new();
        let fp = fingerprint();

        assert!(matches!(pending.admit(&fp, true), Admission::Lead));
        let Admission::Joined(rx1) = pending.admit(&fp, true) else {
            panic!()
        };
        let Admission::Joined(rx2) = pending.admit(&fp, true) else {
            panic!()
        };

        let failure = Err(SessionError::Transport("reset".into()));
        pending.resolve(&fp, &failure);

        assert_eq!(rx1.await.unwrap(), failure);
        assert_eq!(rx2.await.unwrap(), failure);
    }

    #[test]
    fn without_sharing_every_caller_leads() {
        let pending = PendingRequests::new();
        let fp = fingerprint();

        assert!(matches!(pending.admit(&fp, false), Admission::Lead));
        assert!(matches!(pending.admit(&fp, false), Admission::Lead));
    }

    #[tokio::test]
    async fn close_drops_waiters() {
        let pending = PendingRequests::new();
        let fp = fingerprint();

        pending.admit(&fp, true);
        let Admission::Joined(rx) = pending.admit(&fp, true) else {
            panic!()
        };

        pending.close();
        assert!(rx.await.is_err());
    }
}
