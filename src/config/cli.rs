//! Command-line flags and environment overrides.
//!
//! Every flag is optional so that only values the operator actually set
//! override the file (or the defaults). Clap resolves a flag before its
//! environment variable.
//!
//! The buildkitd-specific names of earlier deployments are still accepted:
//! `--sts-name`, `--sts-namespace` and `--headless-service-name` as flag
//! aliases, and the `BUILDKITD_*` variables as a last fallback.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::duration::parse_duration;
use crate::config::schema::{LogFormat, ScalerConfig};
use crate::config::validation::ValidationError;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "scale-gate")]
#[command(about = "TCP proxy that scales a single-replica workload between zero and one", long_about = None)]
pub struct CliArgs {
    /// Optional TOML configuration file
    #[arg(short, long, env = "SCALE_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Proxy listen address and port (e.g. :8080)
    #[arg(long, env = "PROXY_LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    /// Maximum concurrent client connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Name of the workload (StatefulSet)
    #[arg(long, alias = "sts-name", env = "WORKLOAD_NAME")]
    pub workload_name: Option<String>,

    /// Namespace of the workload
    #[arg(long, alias = "sts-namespace", env = "WORKLOAD_NAMESPACE")]
    pub namespace: Option<String>,

    /// Headless service fronting the workload
    #[arg(long, alias = "headless-service-name", env = "HEADLESS_SERVICE_NAME")]
    pub headless_service: Option<String>,

    /// Backend port on the workload instance
    #[arg(long, env = "TARGET_PORT")]
    pub target_port: Option<u16>,

    /// DNS suffix appended to the instance host (e.g. svc.cluster.local)
    #[arg(long, env = "CLUSTER_DOMAIN")]
    pub cluster_domain: Option<String>,

    /// Idle time before scaling to zero (e.g. 2m0s)
    #[arg(long, env = "SCALE_DOWN_IDLE_TIMEOUT", value_parser = parse_duration)]
    pub idle_timeout: Option<Duration>,

    /// How long a first connection waits for readiness (e.g. 5m)
    #[arg(long, env = "READY_TIMEOUT", value_parser = parse_duration)]
    pub ready_timeout: Option<Duration>,

    /// Orchestration API server URL; in-cluster discovery when unset
    #[arg(long, env = "KUBE_API_SERVER")]
    pub api_server: Option<String>,

    /// Kubeconfig file for running outside the cluster
    #[arg(long, env = "KUBECONFIG_PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Bound on draining connections at shutdown (e.g. 25s)
    #[arg(long, env = "SHUTDOWN_TIMEOUT", value_parser = parse_duration)]
    pub shutdown_timeout: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format (text or json)
    #[arg(long, env = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl CliArgs {
    /// Fill values still unset from the `BUILDKITD_*` variables.
    pub fn fill_legacy_env<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fill(&mut self.workload_name, || lookup("BUILDKITD_STATEFULSET_NAME"));
        fill(&mut self.namespace, || lookup("BUILDKITD_STATEFULSET_NAMESPACE"));
        fill(&mut self.headless_service, || lookup("BUILDKITD_HEADLESS_SERVICE_NAME"));
        if self.target_port.is_none() {
            if let Some(raw) = lookup("BUILDKITD_TARGET_PORT") {
                let port = raw.trim().parse().map_err(|_| {
                    ValidationError::new(
                        "workload.port",
                        format!("BUILDKITD_TARGET_PORT {:?} is not a port number", raw),
                    )
                })?;
                self.target_port = Some(port);
            }
        }
        Ok(())
    }

    /// Overlay every value that was supplied onto `config`.
    pub fn apply(&self, config: &mut ScalerConfig) {
        if let Some(v) = &self.listen_addr {
            config.listener.bind_address = v.clone();
        }
        if let Some(v) = self.max_connections {
            config.listener.max_connections = v;
        }
        if let Some(v) = &self.workload_name {
            config.workload.name = v.clone();
        }
        if let Some(v) = &self.namespace {
            config.workload.namespace = v.clone();
        }
        if let Some(v) = &self.headless_service {
            config.workload.headless_service = v.clone();
        }
        if let Some(v) = self.target_port {
            config.workload.port = v;
        }
        if let Some(v) = &self.cluster_domain {
            config.workload.cluster_domain = Some(v.clone());
        }
        if let Some(v) = self.idle_timeout {
            config.scaling.idle_timeout = v;
        }
        if let Some(v) = self.ready_timeout {
            config.scaling.ready_timeout = v;
        }
        if let Some(v) = &self.api_server {
            config.orchestrator.api_server = Some(v.clone());
        }
        if let Some(v) = &self.kubeconfig {
            config.orchestrator.kubeconfig = Some(v.clone());
        }
        if let Some(v) = self.shutdown_timeout {
            config.shutdown.timeout = v;
        }
        if let Some(v) = &self.log_level {
            config.observability.log_level = v.clone();
        }
        if let Some(v) = self.log_format {
            config.observability.log_format = v;
        }
    }
}

fn fill(slot: &mut Option<String>, value: impl FnOnce() -> Option<String>) {
    if slot.is_none() {
        *slot = value();
    }
}
