//! End-to-end CLI tests for the crawl-downloader binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn start_mock_page(path_str: &str, body: &'static [u8], content_type: &str) -> MockServer {
    let content_type = content_type.to_string();
    tokio_test::block_on(async move {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(path_str))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, &content_type))
            .mount(&mock_server)
            .await;
        mock_server
    })
}

#[test]
fn test_cli_no_args_shows_usage() {
    Command::cargo_bin("crawl-downloader")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_lists_options() {
    Command::cargo_bin("crawl-downloader")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--pool-size"))
        .stdout(predicate::str::contains("--proxy"))
        .stdout(predicate::str::contains("--binary"));
}

#[test]
fn test_cli_rejects_invalid_pool_size() {
    Command::cargo_bin("crawl-downloader")
        .unwrap()
        .args(["--pool-size", "0", "http://example.com/"])
        .assert()
        .failure();
}

#[test]
fn test_cli_downloads_page_and_prints_summary() {
    let mock_server = start_mock_page("/index.html", b"<p>hello</p>", "text/html; charset=utf-8");
    let url = format!("{}/index.html", mock_server.uri());

    Command::cargo_bin("crawl-downloader")
        .unwrap()
        .args(["-q", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"))
        .stdout(predicate::str::contains("status=200"))
        .stdout(predicate::str::contains("charset=UTF-8"))
        .stdout(predicate::str::contains("bytes=12"));
}

#[test]
fn test_cli_json_output_for_binary() {
    let mock_server = start_mock_page("/blob", b"\x00\x01\x02\x03", "application/octet-stream");
    let url = format!("{}/blob", mock_server.uri());

    let output = Command::cargo_bin("crawl-downloader")
        .unwrap()
        .args(["-q", "--binary", "--json", &url])
        .output()
        .unwrap();

    assert!(output.status.success());
    let line = String::from_utf8(output.stdout).unwrap();
    let summary: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(summary["url"], url.as_str());
    assert_eq!(summary["success"], true);
    assert_eq!(summary["bytes"], 4);
    assert!(summary["status_code"].is_null());
}

#[test]
fn test_cli_unreachable_host_reports_failure() {
    Command::cargo_bin("crawl-downloader")
        .unwrap()
        .args(["-q", "http://127.0.0.1:1/"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAIL"));
}
