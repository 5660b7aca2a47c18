//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use scale_gate::config::{ScalingConfig, WorkloadConfig};
use scale_gate::net::{BackendTarget, Connector, Listener};
use scale_gate::orchestrator::{OrchestratorError, OrchestratorResult, ReplicaClient, ReplicaStatus};
use scale_gate::ScaleController;

/// How the fake workload reacts to a scale-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollout {
    /// Becomes ready after this many status reads.
    ReadyAfter(u32),
    /// Never becomes ready.
    Never,
}

#[derive(Debug)]
struct FakeState {
    status: ReplicaStatus,
    rollout: Rollout,
    reads_until_ready: Option<u32>,
    scale_calls: Vec<u32>,
    status_calls: u32,
}

/// In-memory workload with a scripted rollout.
#[derive(Debug)]
pub struct FakeReplicaClient {
    state: Mutex<FakeState>,
    missing: AtomicBool,
    fail_status: AtomicBool,
    fail_scale: AtomicBool,
}

impl FakeReplicaClient {
    pub fn new(status: ReplicaStatus, rollout: Rollout) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                status,
                rollout,
                reads_until_ready: None,
                scale_calls: Vec::new(),
                status_calls: 0,
            }),
            missing: AtomicBool::new(false),
            fail_status: AtomicBool::new(false),
            fail_scale: AtomicBool::new(false),
        })
    }

    /// Scaled to zero; becomes ready on the first read after scale-up.
    pub fn idle() -> Arc<Self> {
        Self::new(ReplicaStatus::new(0, 0, 0), Rollout::ReadyAfter(1))
    }

    /// One replica, ready.
    pub fn running() -> Arc<Self> {
        Self::new(ReplicaStatus::new(1, 1, 1), Rollout::ReadyAfter(1))
    }

    pub fn scale_calls(&self) -> Vec<u32> {
        self.state.lock().unwrap().scale_calls.clone()
    }

    pub fn status_calls(&self) -> u32 {
        self.state.lock().unwrap().status_calls
    }

    pub fn status(&self) -> ReplicaStatus {
        self.state.lock().unwrap().status
    }

    pub fn set_status(&self, status: ReplicaStatus) {
        self.state.lock().unwrap().status = status;
    }

    pub fn set_missing(&self, missing: bool) {
        self.missing.store(missing, Ordering::SeqCst);
    }

    pub fn set_fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_scale(&self, fail: bool) {
        self.fail_scale.store(fail, Ordering::SeqCst);
    }

    fn not_found(namespace: &str, name: &str) -> OrchestratorError {
        OrchestratorError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl ReplicaClient for FakeReplicaClient {
    async fn get_status(&self, namespace: &str, name: &str) -> OrchestratorResult<ReplicaStatus> {
        let mut state = self.state.lock().unwrap();
        state.status_calls += 1;
        if self.missing.load(Ordering::SeqCst) {
            return Err(Self::not_found(namespace, name));
        }
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(OrchestratorError::Api {
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        if let Some(remaining) = state.reads_until_ready {
            if remaining <= 1 {
                let desired = state.status.desired;
                state.status.current = desired;
                state.status.ready = desired;
                state.reads_until_ready = None;
            } else {
                state.reads_until_ready = Some(remaining - 1);
            }
        }
        Ok(state.status)
    }

    async fn set_desired_replicas(
        &self,
        namespace: &str,
        name: &str,
        count: u32,
    ) -> OrchestratorResult<ReplicaStatus> {
        let mut state = self.state.lock().unwrap();
        state.scale_calls.push(count);
        if self.missing.load(Ordering::SeqCst) {
            return Err(Self::not_found(namespace, name));
        }
        if self.fail_scale.load(Ordering::SeqCst) {
            return Err(OrchestratorError::Api {
                status: 409,
                message: "injected conflict".to_string(),
            });
        }
        state.status.desired = count;
        if count == 0 {
            state.status.current = 0;
            state.status.ready = 0;
            state.reads_until_ready = None;
        } else {
            state.reads_until_ready = match state.rollout {
                Rollout::ReadyAfter(reads) => Some(reads),
                Rollout::Never => None,
            };
        }
        Ok(state.status)
    }
}

/// Records every dial target and connects to a local address instead.
#[derive(Debug)]
pub struct RecordingConnector {
    redirect: SocketAddr,
    targets: Mutex<Vec<BackendTarget>>,
    fail: AtomicBool,
    dials: AtomicU32,
}

impl RecordingConnector {
    pub fn new(redirect: SocketAddr) -> Arc<Self> {
        Arc::new(Self {
            redirect,
            targets: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            dials: AtomicU32::new(0),
        })
    }

    /// A connector whose every dial is refused.
    pub fn refusing() -> Arc<Self> {
        let connector = Self::new(SocketAddr::from(([127, 0, 0, 1], 9)));
        connector.fail.store(true, Ordering::SeqCst);
        connector
    }

    pub fn targets(&self) -> Vec<BackendTarget> {
        self.targets.lock().unwrap().clone()
    }

    pub fn dials(&self) -> u32 {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(&self, target: &BackendTarget) -> io::Result<TcpStream> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "injected refusal"));
        }
        TcpStream::connect(self.redirect).await
    }
}

/// Start a backend that echoes every byte back and half-closes on EOF.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut read, mut write) = socket.into_split();
                let _ = tokio::io::copy(&mut read, &mut write).await;
                let _ = write.shutdown().await;
            });
        }
    });

    addr
}

/// Start a backend that sends `greeting`, then reads until EOF and replies
/// with the number of bytes it received.
pub async fn start_counting_backend(greeting: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket.write_all(greeting).await;
                let mut received = Vec::new();
                let _ = socket.read_to_end(&mut received).await;
                let _ = socket.write_all(received.len().to_string().as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Workload settings matching the default deployment.
pub fn workload() -> WorkloadConfig {
    WorkloadConfig::default()
}

/// Short timings so real-time tests finish quickly.
pub fn fast_scaling() -> ScalingConfig {
    ScalingConfig {
        idle_timeout: Duration::from_millis(200),
        ready_timeout: Duration::from_millis(500),
        poll_interval: Duration::from_millis(10),
        dial_timeout: Duration::from_secs(1),
    }
}

pub fn controller(
    client: &Arc<FakeReplicaClient>,
    connector: &Arc<RecordingConnector>,
    scaling: ScalingConfig,
) -> Arc<ScaleController> {
    ScaleController::new(
        Arc::clone(client) as Arc<dyn ReplicaClient>,
        Arc::clone(connector) as Arc<dyn Connector>,
        workload(),
        scaling,
    )
}

/// Bind a proxy listener on an ephemeral port.
pub async fn ephemeral_listener() -> (Listener, SocketAddr) {
    let inner = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = inner.local_addr().unwrap();
    (Listener::from_tcp(inner, 64), addr)
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// A request seen by [`MockApiServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Minimal HTTP/1.1 server answering every request with one scripted response.
#[derive(Debug)]
pub struct MockApiServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockApiServer {
    pub async fn start(status: u16, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = serve_one(socket, status, body, recorded).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_one(
    mut socket: TcpStream,
    status: u16,
    body: &'static str,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (head_end + content_length).min(buf.len());
    let request_body = String::from_utf8_lossy(&buf[head_end..body_end]).into_owned();

    recorded.lock().unwrap().push(RecordedRequest {
        method,
        path,
        headers,
        body: request_body,
    });

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        403 => "Forbidden",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}
