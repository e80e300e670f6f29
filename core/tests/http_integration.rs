/*
 * http_integration.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the streaming HTTP client. Each test runs a canned
 * HTTP/1.1 server on 127.0.0.1 and checks the full request/response cycle:
 * request bytes, status handling, content negotiation, chunked decoding,
 * decompression and session termination.
 *
 * Run with:
 *   cargo test -p ruscello_core --test http_integration -- --nocapture
 */

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use ruscello_core::{ClientConfig, Error, HttpClient, Request, Session};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Read one request (head plus Content-Length body) from `stream`.
async fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            return request;
        }
        request.extend_from_slice(&buf[..n]);
    };
    let head = String::from_utf8_lossy(&request[..head_end]).to_string();
    let body_len = head
        .lines()
        .find_map(|l| l.strip_prefix("Content-Length: "))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while request.len() < head_end + body_len {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }
    request
}

/// Accept one connection, answer with `response`, close. Returns the request bytes.
async fn canned_server(response: Vec<u8>) -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let _ = stream.write_all(&response).await;
        let _ = stream.shutdown().await;
        request
    });
    (format!("http://{}", addr), handle)
}

/// Accept one connection, send `prefix`, then hold the connection open until `release` fires.
async fn stalling_server(prefix: Vec<u8>) -> (String, oneshot::Sender<()>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (release, released) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request(&mut stream).await;
        stream.write_all(&prefix).await.unwrap();
        let _ = released.await;
    });
    (format!("http://{}", addr), release, handle)
}

fn chunked(content_type: &str, chunks: &[&[u8]]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\n\r\n",
        content_type
    )
    .into_bytes();
    for chunk in chunks {
        out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

#[tokio::test]
async fn chunked_events_stream_to_callback() {
    init_logging();
    let response = chunked(
        "application/json",
        &[b"{\"event\":\"a\"}\n{\"ev", b"ent\":\"b\"}\n", b"{\"event\":\"c\"}"],
    );
    let (base, server) = canned_server(response).await;
    let mut events = Vec::new();
    HttpClient::default()
        .get(&format!("{}/events", base), |v| events.push(v))
        .await
        .unwrap();
    assert_eq!(
        events,
        vec![json!({"event": "a"}), json!({"event": "b"}), json!({"event": "c"})]
    );
    let request = String::from_utf8(server.await.unwrap()).unwrap();
    assert!(request.starts_with("GET /events HTTP/1.1\r\nHost: 127.0.0.1:"));
    assert!(request.contains("Accept-Charset: utf-8\r\n"));
}

#[tokio::test]
async fn not_found_carries_code_and_headers() {
    init_logging();
    let (base, server) = canned_server(
        b"HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\nX-Trace: t1\r\nContent-Length: 16\r\n\r\n{\"missing\":true}"
            .to_vec(),
    )
    .await;
    let mut calls = 0;
    let err = HttpClient::default()
        .get(&format!("{}/nope", base), |_| calls += 1)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    match err {
        Error::HttpStatus { headers, .. } => {
            assert_eq!(headers.get("x-trace"), Some("t1"));
            assert_eq!(headers.get("Content-Type"), Some("application/json"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(calls, 0);
    server.await.unwrap();
}

#[tokio::test]
async fn xml_is_rejected_without_parsing() {
    init_logging();
    let (base, server) = canned_server(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/xml\r\n\r\n<a/>".to_vec(),
    )
    .await;
    let mut calls = 0;
    let err = HttpClient::default()
        .get(&base, |_| calls += 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidContentType(ref t) if t == "application/xml"));
    assert_eq!(calls, 0);
    server.await.unwrap();
}

#[tokio::test]
async fn post_raw_body_with_json_content_type() {
    init_logging();
    let (base, server) = canned_server(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json; charset=utf-8\r\n\r\n{\"ok\":true}"
            .to_vec(),
    )
    .await;
    let request = Request::post(&format!("{}/things", base), r#"{"a": 1}"#)
        .unwrap()
        .header("Content-Type", "application/json");
    let values = HttpClient::default().fetch(request).await.unwrap();
    assert_eq!(values, vec![json!({"ok": true})]);
    let written = String::from_utf8(server.await.unwrap()).unwrap();
    assert!(written.contains("Content-Length: 8\r\nContent-Type: application/json\r\n"));
    assert!(!written.contains("application/x-www-form-urlencoded"));
    assert!(written.ends_with("\r\n\r\n{\"a\": 1}"));
}

#[tokio::test]
async fn form_body_and_basic_auth() {
    init_logging();
    let (base, server) = canned_server(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\ntrue".to_vec(),
    )
    .await;
    let uri = base.replace("http://", "http://user:pass@");
    let request = Request::put(&format!("{}/form", uri), ruscello_core::Body::form([("q", "a&b")])).unwrap();
    let values = HttpClient::default().fetch(request).await.unwrap();
    assert_eq!(values, vec![json!(true)]);
    let written = String::from_utf8(server.await.unwrap()).unwrap();
    assert!(written.contains("\r\nAuthorization: Basic dXNlcjpwYXNz\r\n"));
    assert!(written.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
    assert!(written.ends_with("\r\n\r\nq=a%26b"));
}

#[tokio::test]
async fn fetch_of_chunked_body_is_configuration_error() {
    init_logging();
    let (base, server) = canned_server(chunked("application/json", &[b"{}"])).await;
    let err = HttpClient::default()
        .fetch(Request::get(&base).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn custom_allow_list() {
    init_logging();
    let (base, server) = canned_server(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\n\r\n{\"n\":1}\n{\"n\":2}\n".to_vec(),
    )
    .await;
    let client = HttpClient::new(ClientConfig::default().with_allowed_mime_types(["application/x-ndjson"]));
    let values = client.fetch(Request::get(&base).unwrap()).await.unwrap();
    assert_eq!(values, vec![json!({"n": 1}), json!({"n": 2})]);
    server.await.unwrap();
}

#[cfg(feature = "gzip")]
fn gzip(data: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

#[cfg(feature = "gzip")]
#[tokio::test]
async fn gzip_body_until_close() {
    init_logging();
    let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Encoding: gzip\r\n\r\n".to_vec();
    response.extend_from_slice(&gzip(b"[1,2,3] {\"x\":\"y\"}"));
    let (base, server) = canned_server(response).await;
    let mut values = Vec::new();
    HttpClient::default().get(&base, |v| values.push(v)).await.unwrap();
    assert_eq!(values, vec![json!([1, 2, 3]), json!({"x": "y"})]);
    let written = String::from_utf8(server.await.unwrap()).unwrap();
    assert!(written.contains("Accept-Encoding: "));
}

#[cfg(feature = "gzip")]
#[tokio::test]
async fn gzip_inside_chunked_framing() {
    init_logging();
    let compressed = gzip(b"{\"seq\":1}{\"seq\":2}");
    let (first, second) = compressed.split_at(compressed.len() / 2);
    let mut response = chunked("application/json", &[first, second]);
    let head_end = response.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
    let tail = response.split_off(head_end);
    response.extend_from_slice(b"\r\nContent-Encoding: gzip");
    response.extend_from_slice(&tail);
    let (base, server) = canned_server(response).await;
    let mut values = Vec::new();
    HttpClient::default().get(&base, |v| values.push(v)).await.unwrap();
    assert_eq!(values, vec![json!({"seq": 1}), json!({"seq": 2})]);
    server.await.unwrap();
}

#[tokio::test]
async fn terminate_while_read_blocked_returns_normally() {
    init_logging();
    let mut prefix = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    prefix.extend_from_slice(b"b\r\n{\"first\":1}\r\n");
    let (base, release, server) = stalling_server(prefix).await;

    let session = Arc::new(Session::default());
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let request = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            session
                .get(&format!("{}/events", base), move |v| {
                    let _ = tx.send(v);
                })
                .await
        })
    };

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, json!({"first": 1}));
    assert!(!session.is_terminated());

    session.terminate();
    let result = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .expect("terminate did not unblock the read")
        .unwrap();
    assert!(result.is_ok(), "terminated request should return normally: {:?}", result);
    assert!(session.is_terminated());

    // a second terminate is a no-op
    session.terminate();
    let _ = release.send(());
    server.await.unwrap();
}

#[tokio::test]
async fn terminate_from_handle_on_other_thread() {
    init_logging();
    let prefix = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n".to_vec();
    let (base, release, server) = stalling_server(prefix).await;
    let session = Session::default();
    let handle = session.terminate_handle();
    let terminator = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        handle.terminate();
    });
    let result = tokio::time::timeout(Duration::from_secs(5), session.get(&base, |_| {}))
        .await
        .expect("terminate did not unblock the read");
    assert!(result.is_ok());
    assert!(session.is_terminated());
    terminator.join().unwrap();
    let _ = release.send(());
    server.await.unwrap();
}

#[tokio::test]
async fn terminate_after_completion_has_no_effect() {
    init_logging();
    let (base, server) = canned_server(chunked("application/json", &[b"[\"done\"]"])).await;
    let session = Session::default();
    let mut values = Vec::new();
    session.get(&base, |v| values.push(v)).await.unwrap();
    session.terminate();
    assert!(session.is_terminated());
    assert_eq!(values, vec![json!(["done"])]);
    server.await.unwrap();

    // the next request resets the flag
    let (base, server) = canned_server(chunked("application/json", &[b"1"])).await;
    session.get(&base, |_| {}).await.unwrap();
    assert!(!session.is_terminated());
    server.await.unwrap();
}

#[tokio::test]
async fn unterminated_session_propagates_transport_error() {
    init_logging();
    // server closes in the middle of a chunk
    let (base, server) = canned_server(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n10\r\n{\"par".to_vec(),
    )
    .await;
    let session = Session::default();
    let err = session.get(&base, |_| {}).await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {:?}", err);
    assert!(!session.is_terminated());
    server.await.unwrap();
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = HttpClient::default()
        .get(&format!("http://{}/", addr), |_| {})
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[cfg(feature = "deflate")]
#[tokio::test]
async fn deflate_body_cut_short_is_decode_error() {
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;
    init_logging();
    let mut payload = Vec::new();
    for i in 0..2000 {
        payload.extend_from_slice(format!("{{\"seq\":{}}}\n", i).as_bytes());
    }
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&payload).unwrap();
    let compressed = enc.finish().unwrap();
    let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Encoding: deflate\r\n\r\n".to_vec();
    response.extend_from_slice(&compressed[..compressed.len() / 2]);
    let (base, server) = canned_server(response).await;
    let mut count = 0;
    let err = HttpClient::default().get(&base, |_| count += 1).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "got {:?}", err);
    assert!(count < 2000);
    server.await.unwrap();
}

#[cfg(feature = "bzip2")]
#[tokio::test]
async fn bzip2_body_cut_short_is_decode_error() {
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::Write;
    init_logging();
    let mut enc = BzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(b"{\"seq\":1}\n{\"seq\":2}\n{\"seq\":3}\n").unwrap();
    let compressed = enc.finish().unwrap();
    let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Encoding: bzip2\r\n\r\n".to_vec();
    response.extend_from_slice(&compressed[..compressed.len() / 2]);
    let (base, server) = canned_server(response).await;
    let result = tokio::time::timeout(Duration::from_secs(10), HttpClient::default().get(&base, |_| {}))
        .await
        .expect("truncated bzip2 body did not finish");
    assert!(matches!(result, Err(Error::Decode(_))), "got {:?}", result);
    server.await.unwrap();
}

#[tokio::test]
async fn header_with_line_break_is_rejected_before_sending() {
    init_logging();
    let (base, server) = canned_server(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{}".to_vec()).await;
    let request = Request::get(&base).unwrap().header("X-A", "1\r\nX-Injected: yes");
    let err = HttpClient::default().send(request, |_| {}).await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "got {:?}", err);
    assert!(server.await.unwrap().is_empty());
}
