//! Download and confirmation tests against a stub HTTP server.

use std::time::Duration;

use notification_core::{
    Dispatcher, FetchConfig, FilterCriteria, HttpConfirmer, HttpFetcher, NotifyError,
    ObjectFetcher, Outcome, SubscriptionConfirmer,
};
use test_utils::{confirmation_envelope, diagnostic_envelope, StubRoute, StubServer};

fn fetcher(dir: &std::path::Path) -> HttpFetcher {
    let mut config = FetchConfig::new("test-key", dir.join("objects"));
    config.request_timeout = Duration::from_secs(10);
    HttpFetcher::new(config).unwrap()
}

fn confirmer() -> HttpConfirmer {
    HttpConfirmer::new(Duration::from_secs(10)).unwrap()
}

// ============================================================================
// Object fetcher
// ============================================================================

#[tokio::test]
async fn test_fetch_writes_final_segment_with_api_key() {
    let server = StubServer::start(vec![StubRoute::ok("/data/foo.nc", b"netcdf bytes")]).await;
    let dir = test_utils::temp_download_dir();
    let fetcher = fetcher(dir.path());

    let path = fetcher.fetch(&server.url("/data/foo.nc")).await.unwrap();

    assert_eq!(path, dir.path().join("objects").join("foo.nc"));
    assert_eq!(std::fs::read(&path).unwrap(), b"netcdf bytes");
    assert_eq!(std::fs::read_dir(dir.path().join("objects")).unwrap().count(), 1);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].header("x-api-key"), Some("test-key"));
}

#[tokio::test]
async fn test_fetch_twice_overwrites() {
    let server = StubServer::start(vec![
        StubRoute::ok("/a/foo.nc", b"first version, longer body"),
        StubRoute::ok("/b/foo.nc", b"second"),
    ])
    .await;
    let dir = test_utils::temp_download_dir();
    let fetcher = fetcher(dir.path());

    fetcher.fetch(&server.url("/a/foo.nc")).await.unwrap();
    let path = fetcher.fetch(&server.url("/b/foo.nc")).await.unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"second");
    let entries = std::fs::read_dir(dir.path().join("objects")).unwrap().count();
    assert_eq!(entries, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_fetches_of_same_name_both_succeed() {
    let first = vec![b'a'; 256 * 1024];
    let second = vec![b'b'; 128 * 1024];
    let server = StubServer::start(vec![
        StubRoute::ok("/x/foo.nc", &first),
        StubRoute::ok("/y/foo.nc", &second),
    ])
    .await;
    let dir = test_utils::temp_download_dir();
    let fetcher = fetcher(dir.path());

    for _ in 0..10 {
        let url_x = server.url("/x/foo.nc");
        let url_y = server.url("/y/foo.nc");
        let (a, b) = tokio::join!(fetcher.fetch(&url_x), fetcher.fetch(&url_y));
        let path = a.unwrap();
        assert_eq!(b.unwrap(), path);

        let contents = std::fs::read(&path).unwrap();
        assert!(contents == first || contents == second);
    }

    let entries = std::fs::read_dir(dir.path().join("objects")).unwrap().count();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_fetch_into_existing_directory() {
    let server = StubServer::start(vec![StubRoute::ok("/foo.nc", b"x")]).await;
    let dir = test_utils::temp_download_dir();
    std::fs::create_dir_all(dir.path().join("objects")).unwrap();

    let path = fetcher(dir.path()).fetch(&server.url("/foo.nc")).await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_fetch_rejects_error_status_without_writing() {
    let server = StubServer::start(vec![StubRoute::status("/foo.nc", 403, "Forbidden")]).await;
    let dir = test_utils::temp_download_dir();

    let err = fetcher(dir.path())
        .fetch(&server.url("/foo.nc"))
        .await
        .unwrap_err();

    match err {
        NotifyError::FetchStatus { status, .. } => assert_eq!(status, 403),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!dir.path().join("objects").join("foo.nc").exists());
}

#[tokio::test]
async fn test_abandoned_fetch_leaves_no_temp_file() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Sends headers and part of the body, then stalls
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stalled = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000000\r\n\r\npartial body")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let dir = test_utils::temp_download_dir();
    let fetcher = fetcher(dir.path());
    let url = format!("http://{}/foo.nc", addr);

    let result = tokio::time::timeout(Duration::from_millis(500), fetcher.fetch(&url)).await;
    assert!(result.is_err());
    stalled.abort();

    let entries = std::fs::read_dir(dir.path().join("objects")).unwrap().count();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn test_fetch_unreachable_host_is_transport_error() {
    let dir = test_utils::temp_download_dir();
    let err = fetcher(dir.path())
        .fetch("http://127.0.0.1:1/foo.nc")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "transport");
}

// ============================================================================
// Subscription confirmation
// ============================================================================

#[tokio::test]
async fn test_confirm_200_succeeds() {
    let server = StubServer::start(vec![StubRoute::ok("/confirm", "<ConfirmSubscriptionResponse/>")]).await;

    confirmer()
        .confirm(&server.url("/confirm?Token=abc"))
        .await
        .unwrap();

    assert_eq!(server.hits("/confirm"), 1);
    assert_eq!(server.requests()[0].path, "/confirm?Token=abc");
}

#[tokio::test]
async fn test_confirm_404_carries_status() {
    let server = StubServer::start(vec![]).await;

    match confirmer().confirm(&server.url("/confirm")).await {
        Err(NotifyError::Confirmation { status }) => assert_eq!(status, 404),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_confirm_other_success_codes_fail() {
    let server = StubServer::start(vec![StubRoute::status("/confirm", 204, "")]).await;

    match confirmer().confirm(&server.url("/confirm")).await {
        Err(NotifyError::Confirmation { status }) => assert_eq!(status, 204),
        other => panic!("unexpected result: {:?}", other),
    }
}

// ============================================================================
// End to end through the dispatcher
// ============================================================================

#[tokio::test]
async fn test_dispatch_downloads_matching_object() {
    let server = StubServer::start(vec![StubRoute::ok("/obj123.dat", b"object")]).await;
    let dir = test_utils::temp_download_dir();
    let criteria = FilterCriteria::new(
        Some(0),
        Some(12),
        vec!["surface_temperature".to_string()],
    )
    .unwrap();
    let dispatcher = Dispatcher::new(criteria, fetcher(dir.path()), confirmer());

    let envelope = diagnostic_envelope(&server.url("/obj123.dat"), "surface_temperature", 6);
    let outcome = dispatcher.dispatch(&envelope, None).await.unwrap();

    let expected = dir.path().join("objects").join("obj123.dat");
    assert_eq!(
        outcome,
        Outcome::NotificationHandled {
            url: server.url("/obj123.dat"),
            fetched: Some(expected.clone()),
        }
    );
    assert_eq!(std::fs::read(expected).unwrap(), b"object");
}

#[tokio::test]
async fn test_dispatch_skips_other_diagnostics() {
    let server = StubServer::start(vec![StubRoute::ok("/obj123.dat", b"object")]).await;
    let dir = test_utils::temp_download_dir();
    let criteria = FilterCriteria::new(
        Some(0),
        Some(12),
        vec!["relative_humidity".to_string()],
    )
    .unwrap();
    let dispatcher = Dispatcher::new(criteria, fetcher(dir.path()), confirmer());

    let envelope = diagnostic_envelope(&server.url("/obj123.dat"), "surface_temperature", 6);
    dispatcher.dispatch(&envelope, None).await.unwrap();

    assert_eq!(server.hits("/obj123.dat"), 0);
}

#[tokio::test]
async fn test_dispatch_confirms_subscription() {
    let server = StubServer::start(vec![StubRoute::ok("/confirm", "ok")]).await;
    let dir = test_utils::temp_download_dir();
    let dispatcher = Dispatcher::new(FilterCriteria::default(), fetcher(dir.path()), confirmer());

    let outcome = dispatcher
        .dispatch(&confirmation_envelope(&server.url("/confirm")), None)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::ConfirmationHandled);
    assert_eq!(server.hits("/confirm"), 1);
}
