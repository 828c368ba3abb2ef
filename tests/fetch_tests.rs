//! HTTP fetch tests against a throwaway local server.

use std::time::Duration;

use apireg::model::HttpMethod;
use apireg::sync::{HttpSpecFetcher, SpecSource};
use apireg::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve one canned response, after `delay`, and hand back the request head.
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
    delay: Duration,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/openapi", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&request).to_string());

        tokio::time::sleep(delay).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    (url, rx)
}

const JSON_DOC: &str = r#"{
  "openapi": "3.0.3",
  "info": {"title": "Users", "version": "1.0.0"},
  "paths": {
    "/users": {
      "get": {"summary": "List users"},
      "post": {"description": "Create a user", "deprecated": true}
    }
  }
}"#;

const YAML_DOC: &str = "swagger: '2.0'
info:
  title: Users
  version: 1.0.0
paths:
  /users/{id}:
    delete:
      summary: Delete a user
";

#[tokio::test]
async fn test_fetches_json_document() {
    let (url, request) = serve_once("200 OK", "application/json", JSON_DOC, Duration::ZERO).await;
    let fetcher = HttpSpecFetcher::new(Duration::from_secs(5)).unwrap();

    let ops = fetcher.fetch(&url).await.unwrap();

    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].method, HttpMethod::Get);
    assert_eq!(ops[0].description.as_deref(), Some("List users"));
    assert_eq!(ops[1].method, HttpMethod::Post);
    assert_eq!(ops[1].description.as_deref(), Some("Create a user"));
    assert!(ops[1].deprecated);

    let head = request.await.unwrap().to_lowercase();
    assert!(head.starts_with("get /openapi"));
    assert!(head.contains("accept: application/json, application/yaml"));
}

#[tokio::test]
async fn test_fetches_yaml_document() {
    let (url, _) = serve_once("200 OK", "application/yaml", YAML_DOC, Duration::ZERO).await;
    let fetcher = HttpSpecFetcher::new(Duration::from_secs(5)).unwrap();

    let ops = fetcher.fetch(&url).await.unwrap();

    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].method, HttpMethod::Delete);
    assert_eq!(ops[0].path, "/users/{id}");
}

#[tokio::test]
async fn test_error_status_is_a_fetch_error() {
    let (url, _) = serve_once(
        "500 Internal Server Error",
        "text/plain",
        "boom",
        Duration::ZERO,
    )
    .await;
    let fetcher = HttpSpecFetcher::new(Duration::from_secs(5)).unwrap();

    let err = fetcher.fetch(&url).await.unwrap_err();

    let Error::Fetch { message, .. } = err else {
        panic!("expected Fetch, got {err:?}");
    };
    assert!(message.contains("500"));
}

#[tokio::test]
async fn test_html_body_is_a_parse_error() {
    let (url, _) = serve_once(
        "200 OK",
        "text/html",
        "<html><body>login</body></html>",
        Duration::ZERO,
    )
    .await;
    let fetcher = HttpSpecFetcher::new(Duration::from_secs(5)).unwrap();

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let (url, _) = serve_once("200 OK", "application/json", JSON_DOC, Duration::from_secs(5)).await;
    let fetcher = HttpSpecFetcher::new(Duration::from_millis(200)).unwrap();

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert!(matches!(err, Error::Fetch { .. }));
}

#[tokio::test]
async fn test_unreachable_host_is_a_fetch_error() {
    // Bind then drop so the port is very likely closed
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/openapi.json", listener.local_addr().unwrap());
    drop(listener);
    let fetcher = HttpSpecFetcher::new(Duration::from_secs(2)).unwrap();

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert!(matches!(err, Error::Fetch { .. }));
}
