//! Install / activate / fetch against a mock origin and a disk store.

use std::time::Duration;

use cachefirst_core::{
    CacheFirstError, CacheStorage, DiskStorage, Lifecycle, OfflineWorker, PreloadSlot,
    RequestKey, ResolveSource, WorkerConfig, PRELOAD_HEADER,
};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGES: &[&str] = &["/", "/index.html", "/docs"];

fn config(origin: &str, temp_dir: &TempDir) -> WorkerConfig {
    WorkerConfig::default()
        .with_origin(origin)
        .with_cache_dir(temp_dir.path().join("stores"))
        .with_precache(PAGES.iter().copied())
        .with_fallback("/index.html")
}

async fn mount_pages(mock_server: &MockServer) {
    for page in PAGES {
        Mock::given(method("GET"))
            .and(path(*page))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("page {}", page)))
            .mount(mock_server)
            .await;
    }
}

fn unreachable_origin() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn test_install_seeds_and_survives_going_offline() {
    let mock_server = MockServer::start().await;
    mount_pages(&mock_server).await;
    let temp_dir = TempDir::new().unwrap();

    let online = OfflineWorker::from_config(config(&mock_server.uri(), &temp_dir)).unwrap();
    online.on_install().await.expect("install failed");

    // Same store, origin gone.
    let offline = OfflineWorker::from_config(config(&unreachable_origin(), &temp_dir)).unwrap();
    offline.on_activate().await.unwrap();

    let mut docs = offline.handle(RequestKey::get("/docs")).await;
    assert_eq!(docs.source, ResolveSource::Cache);
    assert_eq!(docs.response.text().unwrap(), "page /docs");

    let mut unknown = offline.handle(RequestKey::navigate("/manual")).await;
    assert_eq!(unknown.source, ResolveSource::Fallback);
    assert_eq!(unknown.response.text().unwrap(), "page /index.html");
}

#[tokio::test]
async fn test_install_fails_if_any_resource_fails() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    for page in ["/", "/index.html"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;
    }
    let temp_dir = TempDir::new().unwrap();

    let worker = OfflineWorker::from_config(config(&mock_server.uri(), &temp_dir)).unwrap();
    let err = worker.on_install().await.unwrap_err();

    match err {
        CacheFirstError::Seed { resource, reason } => {
            assert_eq!(resource, "/docs");
            assert_eq!(reason, "HTTP 500");
        }
        other => panic!("expected Seed error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_install_fails_when_origin_unreachable() {
    let temp_dir = TempDir::new().unwrap();
    let worker = OfflineWorker::from_config(config(&unreachable_origin(), &temp_dir)).unwrap();

    let err = worker.on_install().await.unwrap_err();
    assert!(matches!(err, CacheFirstError::Seed { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_activated_worker_uses_navigation_preload() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/playground"))
        .and(header(PRELOAD_HEADER, "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("preloaded"))
        .mount(&mock_server)
        .await;
    let temp_dir = TempDir::new().unwrap();

    let worker = OfflineWorker::from_config(config(&mock_server.uri(), &temp_dir)).unwrap();
    worker.on_activate().await.unwrap();

    let mut resolved = worker.handle(RequestKey::navigate("/playground")).await;
    assert_eq!(resolved.source, ResolveSource::Preload);
    assert_eq!(resolved.response.text().unwrap(), "preloaded");

    // Populated by the detached write; later navigations are answered from the
    // cache even though the environment still dispatches a preload.
    let storage = DiskStorage::with_dir(temp_dir.path().join("stores"));
    let mut written = false;
    for _ in 0..200 {
        if let Ok(Some(_)) = storage.match_request(&RequestKey::get("/playground")).await {
            written = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(written, "preloaded response never cached");

    let mut hit = worker.handle(RequestKey::navigate("/playground")).await;
    assert_eq!(hit.source, ResolveSource::Cache);
    assert_eq!(hit.response.text().unwrap(), "preloaded");
}

#[tokio::test]
async fn test_on_fetch_never_fails() {
    let temp_dir = TempDir::new().unwrap();
    let worker = OfflineWorker::from_config(config(&unreachable_origin(), &temp_dir)).unwrap();

    let mut response = worker
        .on_fetch(RequestKey::get("/anything"), PreloadSlot::empty())
        .await;
    assert_eq!(response.status, 408);
    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert!(!response.text().unwrap().is_empty());
}
