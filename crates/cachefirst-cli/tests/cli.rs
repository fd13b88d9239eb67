#![allow(deprecated)]
//! Command-line contract: output lines and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENV_VARS: &[&str] = &[
    "CACHEFIRST_CACHE_NAME",
    "CACHEFIRST_ORIGIN",
    "CACHEFIRST_FALLBACK",
    "CACHEFIRST_TIMEOUT",
    "CACHEFIRST_CACHE_DIR",
    "CACHEFIRST_NAVIGATION_PRELOAD",
];

fn cachefirst(cache_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("cachefirst").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("RUST_LOG", "warn").arg("--cache-dir").arg(cache_dir);
    cmd
}

fn unreachable_origin() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[test]
fn test_help_lists_commands() {
    let dir = tempdir().unwrap();
    cachefirst(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_list_empty_store() {
    let dir = tempdir().unwrap();
    cachefirst(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("v1 is empty"));
}

#[test]
fn test_offline_fetch_prints_synthesized_408() {
    let dir = tempdir().unwrap();
    cachefirst(dir.path())
        .args(["--origin", &unreachable_origin(), "fetch", "/docs", "--include-body"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("408 synthesized"))
        .stdout(predicate::str::contains("Network error happened"));
}

#[test]
fn test_install_offline_exits_with_seed_error() {
    let dir = tempdir().unwrap();
    cachefirst(dir.path())
        .args(["--origin", &unreachable_origin(), "install"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("install failed"));
}

#[test]
fn test_bad_config_file_exits_with_config_error() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("cachefirst.yaml");
    std::fs::write(&config, "unknown_key: true\n").unwrap();

    cachefirst(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration error"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fetch_populates_store_then_list_shows_entry() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&mock_server)
        .await;
    let dir = tempdir().unwrap();

    cachefirst(dir.path())
        .args(["--origin", &mock_server.uri(), "fetch", "/docs", "--include-body"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("200 network"))
        .stdout(predicate::str::contains("hello"));

    cachefirst(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("GET /docs 200 5B"));

    // Served from the store now, even with the origin gone.
    cachefirst(dir.path())
        .args(["--origin", &unreachable_origin(), "fetch", "/docs"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("200 cache"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_uncacheable_response_exits_without_waiting() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/video"))
        .respond_with(ResponseTemplate::new(206).set_body_string("part"))
        .mount(&mock_server)
        .await;
    let dir = tempdir().unwrap();

    // A wait for the write would run into the command timeout.
    cachefirst(dir.path())
        .args(["--origin", &mock_server.uri(), "fetch", "/video", "--settle-ms", "60000"])
        .timeout(std::time::Duration::from_secs(15))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("206 network"));

    cachefirst(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("v1 is empty"));
}
