//! Shared helpers for download integration tests.
//!
//! wiremock covers well-formed exchanges; the raw socket servers here produce
//! the broken ones (dropped connections, truncated bodies) and act as an HTTP
//! proxy that records what it was asked for.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crawl_downloader::{Proxy, ProxyOutcome, ProxyProvider, Task};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Address that refuses connections on any sane test host.
pub const CLOSED_PORT_PROXY: (&str, u16) = ("127.0.0.1", 1);

/// Proxy provider that hands out one fixed proxy and records every release.
#[derive(Debug)]
pub struct CountingProxyProvider {
    proxy: Option<Proxy>,
    acquired: AtomicUsize,
    released: Mutex<Vec<(Proxy, Option<ProxyOutcome>)>>,
}

impl CountingProxyProvider {
    pub fn new(proxy: Proxy) -> Self {
        Self {
            proxy: Some(proxy),
            acquired: AtomicUsize::new(0),
            released: Mutex::new(Vec::new()),
        }
    }

    /// A provider that never has a proxy to give.
    pub fn empty() -> Self {
        Self {
            proxy: None,
            acquired: AtomicUsize::new(0),
            released: Mutex::new(Vec::new()),
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> Vec<(Proxy, Option<ProxyOutcome>)> {
        self.released.lock().unwrap().clone()
    }
}

impl ProxyProvider for CountingProxyProvider {
    fn acquire(&self, _task: &dyn Task) -> Option<Proxy> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.proxy.clone()
    }

    fn release(&self, proxy: Proxy, outcome: Option<&ProxyOutcome>, _task: &dyn Task) {
        self.released.lock().unwrap().push((proxy, outcome.copied()));
    }
}

/// Starts a server that accepts connections and closes them without a reply.
///
/// Returns the base URL (`http://127.0.0.1:port`).
pub async fn start_dropping_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let _ = read_request_head(&mut stream).await;
            drop(stream);
        }
    });
    format!("http://{addr}")
}

/// Starts a server that announces `declared_len` bytes but sends only `body`.
pub async fn start_truncating_server(declared_len: usize, body: &'static [u8]) -> String {
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {declared_len}\r\nConnection: close\r\n\r\n"
    );
    start_canned_server(head.into_bytes(), body).await.0
}

/// Starts a server that answers every request with `head` followed by `body`.
///
/// Returns the base URL and a log of the request lines it received.
pub async fn start_canned_server(
    head: Vec<u8>,
    body: &'static [u8],
) -> (String, std::sync::Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
    let log = std::sync::Arc::clone(&seen);
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let head = head.clone();
            let log = std::sync::Arc::clone(&log);
            tokio::spawn(async move {
                if let Some(request_head) = read_request_head(&mut stream).await {
                    if let Some(line) = request_head.lines().next() {
                        log.lock().unwrap().push(line.to_string());
                    }
                }
                let _ = stream.write_all(&head).await;
                let _ = stream.write_all(body).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    (format!("http://{addr}"), seen)
}

/// Starts a server that plays an HTTP proxy: it answers every request with a
/// small HTML page and logs the request lines (absolute-form URIs).
pub async fn start_recording_proxy() -> (Proxy, std::sync::Arc<Mutex<Vec<String>>>) {
    let body: &'static [u8] = b"<html><body>via proxy</body></html>";
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let (base, seen) = start_canned_server(head.into_bytes(), body).await;
    let port = base
        .rsplit_once(':')
        .and_then(|(_, port)| port.parse::<u16>().ok())
        .unwrap();
    (Proxy::new("127.0.0.1", port), seen)
}

async fn read_request_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return Some(String::from_utf8_lossy(&buf).into_owned());
        }
    }
}
