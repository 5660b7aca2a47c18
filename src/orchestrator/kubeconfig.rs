//! Kubeconfig support for running outside a cluster.
//!
//! Only the current context is read. Embedded `*-data` credentials, client
//! certificates and exec plugins are rejected; point `api_server` at
//! `kubectl proxy` for those setups instead.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::orchestrator::types::{OrchestratorError, OrchestratorResult};

/// Where the bearer token for API requests comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerToken {
    /// Re-read on every request.
    File(PathBuf),
    Static(String),
}

/// API server and credentials selected by a kubeconfig's current context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeconfigEndpoint {
    pub server: String,
    pub ca_cert_path: Option<PathBuf>,
    pub insecure_skip_tls_verify: bool,
    pub token: Option<BearerToken>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    current_context: Option<String>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: Cluster,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Cluster {
    server: String,
    #[serde(default)]
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: Context,
}

#[derive(Debug, Deserialize)]
struct Context {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct User {
    token: Option<String>,
    #[serde(rename = "tokenFile")]
    token_file: Option<PathBuf>,
    client_certificate: Option<PathBuf>,
    client_certificate_data: Option<String>,
    exec: Option<serde_yaml::Value>,
}

/// Read `path` and resolve its current context.
pub fn load_kubeconfig(path: &Path) -> OrchestratorResult<KubeconfigEndpoint> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        OrchestratorError::Credentials(format!("reading kubeconfig {}: {}", path.display(), e))
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_kubeconfig(&content, base)
}

/// Relative file references are resolved against `base`, the directory of
/// the kubeconfig file.
fn parse_kubeconfig(content: &str, base: &Path) -> OrchestratorResult<KubeconfigEndpoint> {
    let doc: Kubeconfig = serde_yaml::from_str(content)
        .map_err(|e| OrchestratorError::Credentials(format!("parsing kubeconfig: {}", e)))?;

    let context_name = doc
        .current_context
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| credentials("kubeconfig has no current-context"))?;
    let context = &doc
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .ok_or_else(|| credentials(format!("context {:?} not found in kubeconfig", context_name)))?
        .context;
    let cluster = &doc
        .clusters
        .iter()
        .find(|c| c.name == context.cluster)
        .ok_or_else(|| credentials(format!("cluster {:?} not found in kubeconfig", context.cluster)))?
        .cluster;

    if cluster.certificate_authority_data.is_some() {
        return Err(unsupported("certificate-authority-data"));
    }

    let token = match &context.user {
        None => None,
        Some(user_name) => {
            let user = &doc
                .users
                .iter()
                .find(|u| &u.name == user_name)
                .ok_or_else(|| credentials(format!("user {:?} not found in kubeconfig", user_name)))?
                .user;
            if user.client_certificate.is_some() || user.client_certificate_data.is_some() {
                return Err(unsupported("client certificates"));
            }
            if user.exec.is_some() {
                return Err(unsupported("exec credential plugins"));
            }
            match (&user.token, &user.token_file) {
                (Some(token), _) => Some(BearerToken::Static(token.clone())),
                (None, Some(file)) => Some(BearerToken::File(relative_to(base, file))),
                (None, None) => None,
            }
        }
    };

    Ok(KubeconfigEndpoint {
        server: cluster.server.clone(),
        ca_cert_path: cluster.certificate_authority.as_ref().map(|p| relative_to(base, p)),
        insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
        token,
    })
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn credentials(message: impl Into<String>) -> OrchestratorError {
    OrchestratorError::Credentials(message.into())
}

fn unsupported(what: &str) -> OrchestratorError {
    credentials(format!(
        "kubeconfig {} are not supported; run `kubectl proxy` and set api_server instead",
        what
    ))
}
