//! HTTP-level tests for the gateway, against a mock watchlist service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use watchlist_auth::{AuthError, TokenCache};
use watchlist_gateway::{
    GatewayError, Protocol, ServiceAddress, Watchlist, WatchlistEntry, WatchlistGateway,
};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn address_of(server: &MockServer) -> ServiceAddress {
    let url = Url::parse(&server.uri()).unwrap();

    ServiceAddress::new(
        Protocol::Http,
        url.host_str().unwrap(),
        url.port().unwrap(),
    )
    .unwrap()
}

fn counting_tokens(calls: Arc<AtomicU32>) -> TokenCache {
    TokenCache::with_jitter(
        move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AuthError>("test-token".to_string())
            }
        },
        Duration::ZERO,
        Duration::ZERO,
    )
}

fn unstarted_gateway(server: &MockServer) -> (WatchlistGateway, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let tokens = counting_tokens(Arc::clone(&calls));

    let gateway = WatchlistGateway::with_address(
        address_of(server),
        Url::parse("wss://localhost/v1/").unwrap(),
        tokens,
    );

    (gateway, calls)
}

async fn started_gateway(server: &MockServer) -> WatchlistGateway {
    let (gateway, _calls) = unstarted_gateway(server);
    gateway.start().await.unwrap();
    gateway
}

#[tokio::test]
async fn start_is_idempotent_and_single_flight() {
    let server = MockServer::start().await;
    let (gateway, calls) = unstarted_gateway(&server);

    let (a, b) = tokio::join!(gateway.start(), gateway.start());
    a.unwrap();
    b.unwrap();

    gateway.start().await.unwrap();

    // One credential fetch backs every start call.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_start_can_be_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    // The first refresh fails all three tries; the next one succeeds.
    let tokens = TokenCache::with_jitter(
        move || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(AuthError::GenerationFailed("issuer down".into()))
                } else {
                    Ok("recovered".to_string())
                }
            }
        },
        Duration::ZERO,
        Duration::ZERO,
    );

    let gateway = WatchlistGateway::with_address(
        ServiceAddress::new(Protocol::Http, "localhost", 8080).unwrap(),
        Url::parse("wss://localhost/v1/").unwrap(),
        tokens,
    );

    let first = gateway.start().await;
    assert!(matches!(first, Err(GatewayError::StartFailed(_))));

    gateway.start().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn operations_require_start() {
    let server = MockServer::start().await;
    let (gateway, _calls) = unstarted_gateway(&server);

    let result = gateway.read_watchlists().await;
    assert!(matches!(result, Err(GatewayError::NotStarted)));

    let subscribed = gateway.subscribe(|_| {}, |_| {}, false);
    assert!(matches!(subscribed, Err(GatewayError::NotStarted)));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn disposal_is_final() {
    let server = MockServer::start().await;
    let gateway = started_gateway(&server).await;

    gateway.dispose();
    assert!(gateway.is_disposed());

    let read = gateway.read_watchlists().await;
    assert!(matches!(read, Err(GatewayError::Disposed)));

    let restarted = gateway.start().await;
    assert!(matches!(restarted, Err(GatewayError::Disposed)));
}

#[tokio::test]
async fn validation_errors_produce_no_requests() {
    let server = MockServer::start().await;
    let gateway = started_gateway(&server).await;

    let unnamed = gateway.create_watchlist(&Watchlist::new("")).await;
    assert!(matches!(unnamed, Err(GatewayError::Validation(_))));

    let unidentified = gateway.edit_watchlist(&Watchlist::new("Energy")).await;
    assert!(matches!(unidentified, Err(GatewayError::Validation(_))));

    let blank = gateway.delete_watchlist("  ").await;
    assert!(matches!(blank, Err(GatewayError::Validation(_))));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn read_watchlists_decodes_and_authenticates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/watchlists"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "wl-1", "name": "Energy", "entries": [ { "symbol": "CL" } ] }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = started_gateway(&server).await;

    let watchlists = gateway.read_watchlists().await.unwrap();
    assert_eq!(watchlists.len(), 1);
    assert_eq!(watchlists[0].id.as_deref(), Some("wl-1"));
    assert_eq!(watchlists[0].entries[0].symbol, "CL");
}

#[tokio::test]
async fn read_service_metadata_decodes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/service"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "service": { "semver": "4.2.0" },
            "user": { "id": "user-123", "context": "barchart" }
        })))
        .mount(&server)
        .await;

    let gateway = started_gateway(&server).await;

    let metadata = gateway.read_service_metadata().await.unwrap();
    assert_eq!(metadata.service.semver, "4.2.0");
    assert_eq!(metadata.user.unwrap().id, "user-123");
}

#[tokio::test]
async fn create_watchlist_tags_the_client_identity() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/watchlists"))
        .and(header_exists("X-Client-ID"))
        .and(body_json(json!({ "name": "Energy", "entries": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wl-9", "name": "Energy", "entries": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = started_gateway(&server).await;

    let created = gateway.create_watchlist(&Watchlist::new("Energy")).await.unwrap();
    assert_eq!(created.id.as_deref(), Some("wl-9"));

    let requests = server.received_requests().await.unwrap();
    let tagged = requests[0].headers.get("X-Client-ID").unwrap();
    assert_eq!(tagged.to_str().unwrap(), gateway.client_id().as_str());
}

#[tokio::test]
async fn add_symbol_wraps_the_entry() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/watchlists/wl-1/symbols"))
        .and(body_json(json!({ "entry": { "symbol": "TSLA" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wl-1", "name": "Tech", "entries": [ { "symbol": "TSLA" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = started_gateway(&server).await;

    let updated = gateway
        .add_symbol("wl-1", &WatchlistEntry::new("TSLA"))
        .await
        .unwrap();
    assert_eq!(updated.entries.len(), 1);
}

#[tokio::test]
async fn delete_symbol_percent_encodes_the_path() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/watchlists/wl-1/symbols/BRK%2FB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wl-1", "name": "Value", "entries": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = started_gateway(&server).await;

    let updated = gateway.delete_symbol("wl-1", "BRK/B").await.unwrap();
    assert!(updated.entries.is_empty());
}

#[tokio::test]
async fn query_symbol_decodes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/symbols/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "AAPL", "watchlists": ["wl-1", "wl-2"]
        })))
        .mount(&server)
        .await;

    let gateway = started_gateway(&server).await;

    let result = gateway.query_symbol("AAPL").await.unwrap();
    assert_eq!(result.watchlists, vec!["wl-1", "wl-2"]);
}

#[tokio::test]
async fn server_failures_surface_with_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/watchlists"))
        .respond_with(ResponseTemplate::new(500).set_body_string("broken"))
        .mount(&server)
        .await;

    let gateway = started_gateway(&server).await;

    match gateway.read_watchlists().await {
        Err(GatewayError::Service { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "broken");
        }
        other => panic!("expected a service error, got {other:?}"),
    }
}

#[tokio::test]
async fn entitlement_failures_notify_observers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/watchlists"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "code": "ENTITLEMENTS_FAILED" })),
        )
        .mount(&server)
        .await;

    let gateway = started_gateway(&server).await;

    let notified = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&notified);
    gateway.on_authorization_change(move || flag.store(true, Ordering::SeqCst));

    let result = gateway.read_watchlists().await;
    assert!(matches!(
        result,
        Err(GatewayError::Service { status: 403, .. })
    ));
    assert!(notified.load(Ordering::SeqCst));
}

#[tokio::test]
async fn identity_failure_never_reaches_the_server() {
    let server = MockServer::start().await;

    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    // The first credential succeeds (start); every refresh after it fails.
    let tokens = TokenCache::with_jitter(
        move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok("initial".to_string())
                } else {
                    Err(AuthError::GenerationFailed("issuer down".into()))
                }
            }
        },
        Duration::from_millis(10),
        Duration::ZERO,
    );

    let gateway = WatchlistGateway::with_address(
        address_of(&server),
        Url::parse("wss://localhost/v1/").unwrap(),
        tokens,
    );
    gateway.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(25)).await;

    match gateway.read_watchlists().await {
        Err(GatewayError::Identity(AuthError::IdentityFailure { endpoint })) => {
            assert_eq!(endpoint.name, "read-watchlists");
        }
        other => panic!("expected an identity failure, got {other:?}"),
    }

    assert!(server.received_requests().await.unwrap().is_empty());
}
