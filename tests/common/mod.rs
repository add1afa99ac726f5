//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use capability_lifecycle::capability::{Capability, CapabilityKind, CapabilityResult};
use capability_lifecycle::license::License;
use capability_lifecycle::store::{MemoryStore, StoreResult, SystemStore};

/// What a recording capability observed, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    StartBegin,
    StartEnd,
    StopBegin,
    StopEnd,
}

/// Capability that records every start/stop and can be slowed down.
pub struct RecordingCapability {
    kind: CapabilityKind,
    delay: Duration,
    events: Mutex<Vec<Event>>,
    running: Mutex<bool>,
}

impl RecordingCapability {
    pub fn new(kind: CapabilityKind) -> Arc<Self> {
        Self::with_delay(kind, Duration::ZERO)
    }

    pub fn with_delay(kind: CapabilityKind, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            kind,
            delay,
            events: Mutex::new(Vec::new()),
            running: Mutex::new(false),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: Event) -> usize {
        self.events().into_iter().filter(|e| *e == event).count()
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Capability for RecordingCapability {
    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    async fn start(&self) -> CapabilityResult<()> {
        self.record(Event::StartBegin);
        tokio::time::sleep(self.delay).await;
        *self.running.lock().unwrap() = true;
        self.record(Event::StartEnd);
        Ok(())
    }

    async fn stop(&self) -> CapabilityResult<()> {
        self.record(Event::StopBegin);
        tokio::time::sleep(self.delay).await;
        *self.running.lock().unwrap() = false;
        self.record(Event::StopEnd);
        Ok(())
    }
}

/// In-memory store that counts reads and writes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SystemStore for CountingStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which concurrent first loads could race.
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.inner.get(key).await
    }

    async fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.save(key, value).await
    }

    async fn get_all(&self) -> StoreResult<HashMap<String, String>> {
        self.inner.get_all().await
    }
}

/// A valid, unexpired license carrying `features`.
pub fn license(features: &[&str]) -> License {
    License {
        id: "test-license".into(),
        customer: "Test Customer".into(),
        issued_at: 0,
        expires_at: u64::MAX,
        features: features.iter().map(|f| f.to_string()).collect(),
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Start a programmable mock HTTP backend on an ephemeral port.
///
/// Every request is answered with the status and body produced by `f`.
/// Returns the bound address and a counter of requests served.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);

    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let counter = counter.clone();
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        counter.fetch_add(1, Ordering::SeqCst);

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}

/// Start a mock backend that always answers `status`.
pub async fn start_mock_backend(status: u16) -> (SocketAddr, Arc<AtomicUsize>) {
    start_programmable_backend(move || async move { (status, "{}".to_string()) }).await
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 512];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    return;
                }
            }
        }
    }
}
