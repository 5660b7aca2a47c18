//! Backend addressing and connection establishment.

use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::config::WorkloadConfig;

/// Host and port of the workload's first ordinal instance.
///
/// The workload is single-replica, so routing always targets instance 0
/// through its headless-service DNS name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    host: String,
    port: u16,
}

impl BackendTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `<name>-0.<headless_service>.<namespace>[.<cluster_domain>]:<port>`
    pub fn for_workload(workload: &WorkloadConfig) -> Self {
        let mut host = format!(
            "{}-0.{}.{}",
            workload.name, workload.headless_service, workload.namespace
        );
        if let Some(domain) = &workload.cluster_domain {
            host.push('.');
            host.push_str(domain);
        }
        Self {
            host,
            port: workload.port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens the backend side of a proxy session.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &BackendTarget) -> io::Result<TcpStream>;
}

/// Plain TCP dialer with a connect timeout.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, target: &BackendTarget) -> io::Result<TcpStream> {
        let stream = tokio::time::timeout(
            self.timeout,
            TcpStream::connect((target.host(), target.port())),
        )
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {} timed out after {:?}", target, self.timeout),
            )
        })??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
