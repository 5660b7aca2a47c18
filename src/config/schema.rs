//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the scaler.
//! All types derive Serde traits for deserialization from config files.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the scale-to-zero proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ScalerConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// The scalable workload and how to reach its first instance.
    pub workload: WorkloadConfig,

    /// Idle and readiness timing.
    pub scaling: ScalingConfig,

    /// Control-plane connection settings.
    pub orchestrator: OrchestratorConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080" or ":8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// Resolve the bind address, accepting the host-less `:8080` form.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let addr = self.bind_address.trim();
        if addr.starts_with(':') {
            format!("0.0.0.0{}", addr).parse()
        } else {
            addr.parse()
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// The stateful workload whose replica count is driven between 0 and 1.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Workload (StatefulSet) name.
    pub name: String,

    /// Namespace the workload lives in.
    pub namespace: String,

    /// Headless service giving each ordinal instance a stable DNS name.
    pub headless_service: String,

    /// Port the backend listens on.
    pub port: u16,

    /// Optional DNS suffix appended to the instance host,
    /// e.g. "svc.cluster.local".
    pub cluster_domain: Option<String>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            name: "buildkitd".to_string(),
            namespace: "default".to_string(),
            headless_service: "buildkitd-headless".to_string(),
            port: 8372,
            cluster_domain: None,
        }
    }
}

/// Timing for scale decisions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScalingConfig {
    /// Time with zero active connections before scaling to zero.
    #[serde(with = "crate::config::duration")]
    pub idle_timeout: Duration,

    /// How long a first connection waits for the workload to become ready.
    #[serde(with = "crate::config::duration")]
    pub ready_timeout: Duration,

    /// Interval between readiness checks.
    #[serde(with = "crate::config::duration")]
    pub poll_interval: Duration,

    /// Backend connection establishment timeout.
    #[serde(with = "crate::config::duration")]
    pub dial_timeout: Duration,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(120),
            ready_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
            dial_timeout: Duration::from_secs(10),
        }
    }
}

/// Orchestration API connection settings.
///
/// With neither `api_server` nor `kubeconfig` the in-cluster service
/// account is used.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// API server base URL (e.g. "http://127.0.0.1:8001" behind `kubectl proxy`).
    pub api_server: Option<String>,

    /// Kubeconfig file; its current context selects server and token.
    pub kubeconfig: Option<PathBuf>,

    /// Bearer token file. Re-read on every request.
    pub token_path: Option<PathBuf>,

    /// PEM bundle used to verify the API server.
    pub ca_cert_path: Option<PathBuf>,

    /// Per-request timeout.
    #[serde(with = "crate::config::duration")]
    pub request_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            api_server: None,
            kubeconfig: None,
            token_path: None,
            ca_cert_path: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Upper bound on waiting for in-flight sessions after the listener closes.
    #[serde(with = "crate::config::duration")]
    pub timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(25),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {:?} (expected text or json)", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON lines.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}
