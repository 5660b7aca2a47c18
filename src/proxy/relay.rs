//! Bidirectional byte relay between a client and the backend.
//!
//! # Responsibilities
//! - Copy bytes both ways concurrently until each direction ends
//! - Half-close the destination when a direction finishes
//! - Close each socket exactly once, after both directions are done
//!
//! # Design Decisions
//! - Each direction runs as its own task; the session joins both
//! - A finished direction never tears down the other one
//! - EOF and "already closed" are normal endings, not failures
//! - Byte counts survive a failed copy, so partial transfers are reported

use std::io;
use std::net::Shutdown;

use socket2::SockRef;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::net::ConnectionId;

/// Which way bytes flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientToBackend => f.write_str("client_to_backend"),
            Direction::BackendToClient => f.write_str("backend_to_client"),
        }
    }
}

/// Result of one relay direction.
#[derive(Debug)]
pub struct DirectionReport {
    pub direction: Direction,
    pub bytes: u64,
    /// Set only for unexpected I/O failures.
    pub error: Option<io::Error>,
}

/// Byte counts for a finished session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub client_to_backend: u64,
    pub backend_to_client: u64,
}

/// A client socket paired with its backend socket.
#[derive(Debug)]
pub struct ProxySession {
    id: ConnectionId,
    client: TcpStream,
    backend: TcpStream,
}

impl ProxySession {
    pub fn new(id: ConnectionId, client: TcpStream, backend: TcpStream) -> Self {
        Self {
            id,
            client,
            backend,
        }
    }

    /// Relay until both directions complete, then drop both sockets.
    pub async fn run(self) -> SessionStats {
        let id = self.id;
        let (client_read, client_write) = self.client.into_split();
        let (backend_read, backend_write) = self.backend.into_split();

        let upstream = tokio::spawn(copy_half(
            id,
            Direction::ClientToBackend,
            client_read,
            backend_write,
        ));
        let downstream = tokio::spawn(copy_half(
            id,
            Direction::BackendToClient,
            backend_read,
            client_write,
        ));

        let (up, down) = tokio::join!(upstream, downstream);
        let mut stats = SessionStats::default();
        for report in [up, down] {
            match report {
                Ok(report) => {
                    if let Some(e) = &report.error {
                        tracing::warn!(
                            connection_id = %id,
                            direction = %report.direction,
                            error = %e,
                            "Error copying data"
                        );
                    }
                    match report.direction {
                        Direction::ClientToBackend => stats.client_to_backend = report.bytes,
                        Direction::BackendToClient => stats.backend_to_client = report.bytes,
                    }
                }
                Err(e) => {
                    tracing::error!(connection_id = %id, error = %e, "Relay task failed");
                }
            }
        }

        tracing::debug!(
            connection_id = %id,
            client_to_backend = stats.client_to_backend,
            backend_to_client = stats.backend_to_client,
            "Data transfer complete"
        );
        // Both halves of each socket were dropped with their tasks, which
        // closes each socket once.
        stats
    }
}

const RELAY_BUFFER_SIZE: usize = 16 * 1024;

/// Copy until EOF, adding every byte written to `bytes`.
async fn pump<R, W>(source: &mut R, destination: &mut W, bytes: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        destination.write_all(&buf[..n]).await?;
        *bytes += n as u64;
    }
}

/// Stop receiving on the socket behind `half`.
fn shutdown_read(half: &OwnedReadHalf) -> io::Result<()> {
    SockRef::from(half.as_ref()).shutdown(Shutdown::Read)
}

async fn copy_half(
    id: ConnectionId,
    direction: Direction,
    mut source: OwnedReadHalf,
    mut destination: OwnedWriteHalf,
) -> DirectionReport {
    let mut bytes = 0;
    let result = pump(&mut source, &mut destination, &mut bytes).await;

    // No more writes to the destination; the peer sees EOF while the
    // opposite direction keeps draining.
    if let Err(e) = destination.shutdown().await {
        if !is_expected_close(&e) {
            tracing::debug!(connection_id = %id, direction = %direction, error = %e, "Half-close failed");
        }
    }
    // No more reads from the source.
    if let Err(e) = shutdown_read(&source) {
        if !is_expected_close(&e) {
            tracing::debug!(connection_id = %id, direction = %direction, error = %e, "Read shutdown failed");
        }
    }
    drop(source);

    let error = match result {
        Ok(()) => None,
        Err(e) if is_expected_close(&e) => {
            tracing::debug!(
                connection_id = %id,
                direction = %direction,
                error = %e,
                "Copy ended on closed connection"
            );
            None
        }
        Err(e) => Some(e),
    };

    tracing::debug!(connection_id = %id, direction = %direction, bytes, "Data copy finished");
    DirectionReport {
        direction,
        bytes,
        error,
    }
}

/// End-of-stream and "socket already closed" outcomes.
pub fn is_expected_close(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe
    )
}
