// src/utils/test_server.rs

//! One-shot HTTP server for client tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn header_end(request: &[u8]) -> Option<usize> {
    request
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn request_complete(request: &[u8]) -> bool {
    let Some(end) = header_end(request) else {
        return false;
    };
    let headers = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok());
    let chunked = headers
        .lines()
        .any(|line| line.starts_with("transfer-encoding:") && line.contains("chunked"));

    match content_length {
        Some(length) => request.len() >= end + length,
        None if chunked => request.ends_with(b"0\r\n\r\n"),
        None => true,
    }
}

/// Serve a single HTTP request with a canned response.
///
/// Returns the base URL (`http://127.0.0.1:port`) and a handle yielding the
/// raw request bytes.
pub(crate) async fn serve_once(
    status_line: &'static str,
    content_type: Option<&'static str>,
    body: impl Into<Vec<u8>>,
) -> (String, JoinHandle<Vec<u8>>) {
    let body = body.into();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request_complete(&request) {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let mut head = format!("HTTP/1.1 {status_line}\r\n");
        if let Some(content_type) = content_type {
            head.push_str(&format!("Content-Type: {content_type}\r\n"));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        ));
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{addr}"), handle)
}

/// Client that never routes loopback requests through a proxy.
pub(crate) fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
