//! StatefulSet adapter over the Kubernetes REST API.
//!
//! # Responsibilities
//! - Discover the API server (explicit URL, kubeconfig, or in-cluster
//!   service account)
//! - Read `spec.replicas`, `status.replicas`, `status.readyReplicas`
//! - Patch `spec.replicas` with a strategic merge patch
//!
//! # Design Decisions
//! - Plain `reqwest` against apps/v1; the two calls do not justify a full client
//! - Token file re-read per request so projected tokens can rotate
//! - No retries: errors go back to the controller unchanged

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::OrchestratorConfig;
use crate::orchestrator::client::ReplicaClient;
use crate::orchestrator::kubeconfig::{load_kubeconfig, BearerToken};
use crate::orchestrator::types::{OrchestratorError, OrchestratorResult, ReplicaStatus};

const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
const STRATEGIC_MERGE_PATCH: &str = "application/strategic-merge-patch+json";

/// Kubernetes-backed [`ReplicaClient`] managing a StatefulSet.
#[derive(Debug, Clone)]
pub struct KubernetesClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<BearerToken>,
}

/// API server location plus the credentials that come with it.
#[derive(Debug)]
struct Endpoint {
    source: &'static str,
    base_url: Url,
    token: Option<BearerToken>,
    ca_cert_path: Option<PathBuf>,
    insecure_skip_tls_verify: bool,
}

impl KubernetesClient {
    /// Build a client from configuration.
    ///
    /// An explicit `api_server` wins, then `kubeconfig`, then the in-cluster
    /// service account. `token_path` and `ca_cert_path` override whatever
    /// the chosen source provides.
    pub fn from_config(config: &OrchestratorConfig) -> OrchestratorResult<Self> {
        let endpoint = discover(config)?;
        let token = config
            .token_path
            .clone()
            .map(BearerToken::File)
            .or(endpoint.token);
        let ca_path = config.ca_cert_path.clone().or(endpoint.ca_cert_path);

        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);
        if let Some(path) = ca_path {
            builder = builder.add_root_certificate(load_ca(&path)?);
        }
        if endpoint.insecure_skip_tls_verify {
            tracing::warn!(api_server = %endpoint.base_url, "TLS verification disabled by kubeconfig");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;

        tracing::info!(
            api_server = %endpoint.base_url,
            source = endpoint.source,
            token = token.is_some(),
            "Orchestration client configured"
        );

        Ok(Self {
            http,
            base_url: endpoint.base_url,
            token,
        })
    }

    /// Client with an explicit base URL and no credentials.
    pub fn with_base_url(base_url: &str) -> OrchestratorResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: parse_base_url(base_url)?,
            token: None,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn statefulset_url(&self, namespace: &str, name: &str) -> OrchestratorResult<Url> {
        self.base_url
            .join(&format!(
                "apis/apps/v1/namespaces/{}/statefulsets/{}",
                namespace, name
            ))
            .map_err(|e| OrchestratorError::Decode(format!("invalid resource path: {}", e)))
    }

    async fn authorize(&self, request: RequestBuilder) -> OrchestratorResult<RequestBuilder> {
        let request = request.header(ACCEPT, "application/json");
        let token = match &self.token {
            None => return Ok(request),
            Some(BearerToken::Static(token)) => token.clone(),
            Some(BearerToken::File(path)) => tokio::fs::read_to_string(path).await.map_err(|e| {
                OrchestratorError::Credentials(format!("reading token {}: {}", path.display(), e))
            })?,
        };
        let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| OrchestratorError::Credentials(format!("malformed token: {}", e)))?;
        Ok(request.header(AUTHORIZATION, value))
    }
}

#[async_trait]
impl ReplicaClient for KubernetesClient {
    async fn get_status(&self, namespace: &str, name: &str) -> OrchestratorResult<ReplicaStatus> {
        let url = self.statefulset_url(namespace, name)?;
        let response = self.authorize(self.http.get(url)).await?.send().await?;
        read_status(response, namespace, name).await
    }

    async fn set_desired_replicas(
        &self,
        namespace: &str,
        name: &str,
        count: u32,
    ) -> OrchestratorResult<ReplicaStatus> {
        let url = self.statefulset_url(namespace, name)?;
        let patch = serde_json::json!({ "spec": { "replicas": count } });
        let request = self
            .http
            .patch(url)
            .header(CONTENT_TYPE, STRATEGIC_MERGE_PATCH)
            .body(patch.to_string());
        let response = self.authorize(request).await?.send().await?;
        let status = read_status(response, namespace, name).await?;

        tracing::debug!(
            namespace = %namespace,
            workload = %name,
            replicas = count,
            %status,
            "Desired replicas patched"
        );
        Ok(status)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StatefulSet {
    spec: StatefulSetSpec,
    status: StatefulSetStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StatefulSetSpec {
    replicas: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StatefulSetStatus {
    replicas: u32,
    ready_replicas: u32,
}

/// The `Status` object the API server returns on failure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiStatus {
    message: String,
}

async fn read_status(
    response: Response,
    namespace: &str,
    name: &str,
) -> OrchestratorResult<ReplicaStatus> {
    let status = response.status();
    let body = response.bytes().await?;

    if status == StatusCode::NOT_FOUND {
        return Err(OrchestratorError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
    }
    if !status.is_success() {
        let message = serde_json::from_slice::<ApiStatus>(&body)
            .ok()
            .map(|s| s.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
        return Err(OrchestratorError::Api {
            status: status.as_u16(),
            message,
        });
    }

    decode_status(&body)
}

/// Map a StatefulSet document onto a [`ReplicaStatus`].
///
/// An absent `spec.replicas` means the API default of 1; absent status
/// counters mean 0.
fn decode_status(body: &[u8]) -> OrchestratorResult<ReplicaStatus> {
    let sts: StatefulSet =
        serde_json::from_slice(body).map_err(|e| OrchestratorError::Decode(e.to_string()))?;
    Ok(ReplicaStatus {
        desired: sts.spec.replicas.unwrap_or(1),
        current: sts.status.replicas,
        ready: sts.status.ready_replicas,
    })
}

fn parse_base_url(server: &str) -> OrchestratorResult<Url> {
    let mut url = Url::parse(server)
        .map_err(|e| OrchestratorError::Credentials(format!("invalid API server URL {:?}: {}", server, e)))?;
    // Url::join drops the last segment unless the path ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn discover(config: &OrchestratorConfig) -> OrchestratorResult<Endpoint> {
    if let Some(server) = &config.api_server {
        return Ok(Endpoint {
            source: "api_server",
            base_url: parse_base_url(server)?,
            token: None,
            ca_cert_path: None,
            insecure_skip_tls_verify: false,
        });
    }
    if let Some(path) = &config.kubeconfig {
        let kubeconfig = load_kubeconfig(path)?;
        return Ok(Endpoint {
            source: "kubeconfig",
            base_url: parse_base_url(&kubeconfig.server)?,
            token: kubeconfig.token,
            ca_cert_path: kubeconfig.ca_cert_path,
            insecure_skip_tls_verify: kubeconfig.insecure_skip_tls_verify,
        });
    }
    Ok(Endpoint {
        source: "in_cluster",
        base_url: in_cluster_url()?,
        token: Some(BearerToken::File(PathBuf::from(SERVICE_ACCOUNT_TOKEN))),
        ca_cert_path: Some(PathBuf::from(SERVICE_ACCOUNT_CA)),
        insecure_skip_tls_verify: false,
    })
}

fn in_cluster_url() -> OrchestratorResult<Url> {
    let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
        OrchestratorError::Credentials(
            "KUBERNETES_SERVICE_HOST not set and neither api_server nor kubeconfig configured"
                .to_string(),
        )
    })?;
    let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());
    let host = if host.contains(':') {
        format!("[{}]", host)
    } else {
        host
    };
    parse_base_url(&format!("https://{}:{}", host, port))
}

fn load_ca(path: &Path) -> OrchestratorResult<reqwest::Certificate> {
    let pem = std::fs::read(path).map_err(|e| {
        OrchestratorError::Credentials(format!("reading CA bundle {}: {}", path.display(), e))
    })?;
    reqwest::Certificate::from_pem(&pem)
        .map_err(|e| OrchestratorError::Credentials(format!("invalid CA bundle {}: {}", path.display(), e)))
}
