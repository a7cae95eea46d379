mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ok, response, ScriptedTransport};
use portal_session::{
    Bond, BondSwitchingSession, Page, RequestOptions, Session, SessionConfig, SessionError,
};

fn portal_session(transport: Arc<ScriptedTransport>) -> Session {
    Session::new(
        "https://portal.example/".parse().unwrap(),
        SessionConfig::default(),
        transport,
    )
}

/// The full cache lifecycle: a plain get, a cached get, a forced refetch,
/// then TTL expiry and a fresh fetch.
#[tokio::test(start_paused = true)]
async fn cache_lifecycle_end_to_end() {
    let transport = ScriptedTransport::new(|_| ok("home"));
    let session = portal_session(transport.clone());

    // First call goes to the network, second is served from cache.
    let first = session.get("/home", &RequestOptions::default()).await.unwrap();
    let second = session.get("/home", &RequestOptions::default()).await.unwrap();
    assert_eq!(transport.call_count(), 1);
    assert_eq!(first.body, second.body);

    // no_cache bypasses the probe but replaces the entry.
    session.get("/home", &RequestOptions::no_cache()).await.unwrap();
    assert_eq!(transport.call_count(), 2);
    session.get("/home", &RequestOptions::default()).await.unwrap();
    assert_eq!(transport.call_count(), 2);

    // Past the TTL the entry is unreachable and the network is hit again.
    tokio::time::advance(Duration::from_secs(301)).await;
    session.get("/home", &RequestOptions::default()).await.unwrap();
    assert_eq!(transport.call_count(), 3);
}

/// Login-shaped flow: the portal sets its session cookie on the first
/// response and every later request carries it back, including postbacks.
#[tokio::test]
async fn cookies_flow_through_a_postback_sequence() {
    let transport = ScriptedTransport::new(|req| match req.url.path() {
        "/login" => response(
            200,
            &[("set-cookie", "JSESSIONID=s3ss10n; Path=/")],
            "<form/>",
        ),
        "/postback" => {
            assert_eq!(
                req.headers
                    .get(http::header::COOKIE)
                    .and_then(|v| v.to_str().ok()),
                Some("JSESSIONID=s3ss10n")
            );
            ok("postback accepted")
        }
        other => panic!("unexpected path {other}"),
    });
    let session = portal_session(transport.clone());

    session.get("/login", &RequestOptions::default()).await.unwrap();
    let page = session
        .post(
            "/postback",
            &[("javax.faces.ViewState", "j_id42")],
            &RequestOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(page.body, b"postback accepted");
    assert_eq!(session.session_token("portal.example").as_deref(), Some("s3ss10n"));
}

#[tokio::test]
async fn concurrent_shared_requests_collapse_into_one_exchange() {
    let transport = ScriptedTransport::with_latency(Duration::from_millis(20), |_| ok("news"));
    let session = Arc::new(portal_session(transport.clone()));

    let opts = RequestOptions::shared();
    let (a, b, c) = tokio::join!(
        session.get("/news", &opts),
        session.get("/news", &opts),
        session.get("/news", &opts),
    );

    assert_eq!(transport.call_count(), 1);
    for page in [a.unwrap(), b.unwrap(), c.unwrap()] {
        assert_eq!(page.body, b"news");
    }
}

#[tokio::test]
async fn expired_session_redirect_is_distinguishable() {
    let transport = ScriptedTransport::new(|req| match req.url.path() {
        "/files" => response(302, &[("location", "/portal/expirada.jsp")], ""),
        other => panic!("unexpected path {other}"),
    });
    let session = portal_session(transport.clone());

    let page = session.get("/files", &RequestOptions::default()).await.unwrap();
    let err = session.follow_all_redirects(page).await.unwrap_err();

    assert!(matches!(err, SessionError::SessionExpired(_)));
}

#[tokio::test]
async fn bond_switch_then_download() {
    let transport = ScriptedTransport::new(|req| match req.url.path() {
        "/switch/77" => response(302, &[("location", "/home")], ""),
        "/home" => ok("bond 77 home"),
        "/files/report.pdf" => ok("%PDF-1.4 report"),
        other => panic!("unexpected path {other}"),
    });
    let portal = BondSwitchingSession::new(Arc::new(portal_session(transport.clone())));

    let bond = Bond::new("https://portal.example/switch/77".parse().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("report.pdf");

    let path = portal
        .download_by_get(&bond, "/files/report.pdf", &dest, None, &RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(path, dest);
    assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.4 report");
    assert_eq!(portal.current_bond(), bond.key());
    // switch + redirect hop + download
    assert_eq!(transport.call_count(), 3);
    assert_eq!(transport.call(2).url.path(), "/files/report.pdf");
}

#[tokio::test]
async fn close_drops_session_state() {
    let transport = ScriptedTransport::new(|_| {
        response(200, &[("set-cookie", "JSESSIONID=tok; Path=/")], "ok")
    });
    let session = portal_session(transport.clone());

    session.get("/home", &RequestOptions::default()).await.unwrap();
    assert!(session.session_token("portal.example").is_some());

    session.close().await;

    assert!(session.session_token("portal.example").is_none());
    assert_eq!(
        session.get("/home", &RequestOptions::default()).await.unwrap_err(),
        SessionError::Closed
    );
}

#[tokio::test]
async fn pages_expose_their_final_form() {
    let transport = ScriptedTransport::new(|_| {
        response(200, &[("content-type", "text/html; charset=utf-8")], "<html/>")
    });
    let session = portal_session(transport.clone());

    let page: Page = session.get("/home", &RequestOptions::default()).await.unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.text(), "<html/>");
    assert_eq!(page.url.as_str(), "https://portal.example/home");
    assert_eq!(
        page.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("text/html; charset=utf-8")
    );
}
