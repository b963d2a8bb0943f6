//! Fetcher behaviour against a local mock HTTP server.

use std::fs;
use std::net::TcpListener;
use std::sync::Mutex;
use std::time::Duration;

use httpmock::Method::GET;
use httpmock::MockServer;
use nyuukit_core::PipelineError;
use nyuukit_runtime::{DownloadTarget, FetchOptions, Fetcher};
use reqwest::Client;
use tempfile::tempdir;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn fetcher(timeout: Duration) -> Fetcher {
    Fetcher::new(Client::new(), FetchOptions { timeout })
}

fn dir_entries(path: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_fetch_writes_body_and_reports_progress() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let body: Vec<u8> = (0..20_000u32).map(|i| (i % 256) as u8).collect();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/nyuu.tar.xz");
        then.status(200).body(body.clone());
    });

    let tmp = tempdir().unwrap();
    let dest = tmp.path().join("nyuu.tar.xz");
    let seen = Mutex::new(Vec::new());
    let progress = |done: u64, total: Option<u64>| seen.lock().unwrap().push((done, total));

    let written = fetcher(Duration::from_secs(10))
        .fetch(
            &DownloadTarget::new(server.url("/nyuu.tar.xz"), &dest),
            Some(&progress),
        )
        .await
        .unwrap();

    mock.assert();
    assert_eq!(written, 20_000);
    assert_eq!(fs::read(&dest).unwrap(), body);
    assert_eq!(dir_entries(tmp.path()), vec!["nyuu.tar.xz"]);

    let seen = seen.into_inner().unwrap();
    assert!(seen.len() >= 3, "expected block-sized progress, got {seen:?}");
    assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(seen.last(), Some(&(20_000, Some(20_000))));
}

#[tokio::test]
async fn test_http_error_is_download_failed_and_leaves_nothing() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(404).body("not found");
    });

    let tmp = tempdir().unwrap();
    let dest = tmp.path().join("missing.zip");
    let err = fetcher(Duration::from_secs(10))
        .fetch(&DownloadTarget::new(server.url("/missing"), &dest), None)
        .await
        .unwrap_err();

    match err {
        PipelineError::DownloadFailed { url, reason } => {
            assert!(url.ends_with("/missing"));
            assert!(reason.contains("404"), "reason was {reason}");
        }
        other => panic!("expected DownloadFailed, got {other:?}"),
    }
    assert!(dir_entries(tmp.path()).is_empty());
}

#[tokio::test]
async fn test_stalled_server_times_out() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200).body("late").delay(Duration::from_secs(5));
    });

    let tmp = tempdir().unwrap();
    let dest = tmp.path().join("slow.bin");
    let err = fetcher(Duration::from_secs(1))
        .fetch(&DownloadTarget::new(server.url("/slow"), &dest), None)
        .await
        .unwrap_err();

    assert!(
        matches!(err, PipelineError::DownloadTimeout { seconds: 1, .. }),
        "got {err:?}"
    );
    assert!(dir_entries(tmp.path()).is_empty());
}

#[tokio::test]
async fn test_refused_connection_is_download_failed() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let tmp = tempdir().unwrap();
    let err = fetcher(Duration::from_secs(5))
        .fetch(
            &DownloadTarget::new(format!("http://127.0.0.1:{port}/x"), tmp.path().join("x")),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::DownloadFailed { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_existing_file_is_replaced_only_on_success() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(GET).path("/fresh");
        then.status(200).body("fresh");
    });

    let tmp = tempdir().unwrap();
    let dest = tmp.path().join("file.bin");
    fs::write(&dest, "old").unwrap();
    let fetcher = fetcher(Duration::from_secs(10));

    let _ = fetcher
        .fetch(&DownloadTarget::new(server.url("/broken"), &dest), None)
        .await
        .unwrap_err();
    assert_eq!(fs::read_to_string(&dest).unwrap(), "old");

    fetcher
        .fetch(&DownloadTarget::new(server.url("/fresh"), &dest), None)
        .await
        .unwrap();
    assert_eq!(fs::read_to_string(&dest).unwrap(), "fresh");
}
