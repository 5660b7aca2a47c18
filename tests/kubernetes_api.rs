//! `KubernetesClient` against a scripted HTTP server.

mod common;

use std::io::Write;
use std::time::Duration;

use common::MockApiServer;
use scale_gate::config::OrchestratorConfig;
use scale_gate::orchestrator::{KubernetesClient, OrchestratorError, ReplicaClient, ReplicaStatus};

const STATEFULSET: &str = r#"{
    "apiVersion": "apps/v1",
    "kind": "StatefulSet",
    "metadata": {"name": "buildkitd", "namespace": "default"},
    "spec": {"replicas": 1, "serviceName": "buildkitd-headless"},
    "status": {"replicas": 1, "readyReplicas": 0}
}"#;

#[tokio::test]
async fn get_status_reads_the_statefulset() {
    let server = MockApiServer::start(200, STATEFULSET).await;
    let client = KubernetesClient::with_base_url(&server.url()).unwrap();

    let status = client.get_status("default", "buildkitd").await.unwrap();
    assert_eq!(status, ReplicaStatus::new(1, 1, 0));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/apis/apps/v1/namespaces/default/statefulsets/buildkitd");
    assert!(requests[0].header("authorization").is_none());
}

#[tokio::test]
async fn set_desired_replicas_sends_a_merge_patch() {
    let server = MockApiServer::start(200, STATEFULSET).await;
    let client = KubernetesClient::with_base_url(&server.url()).unwrap();

    client.set_desired_replicas("builds", "buildkitd", 0).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].method, "PATCH");
    assert_eq!(requests[0].path, "/apis/apps/v1/namespaces/builds/statefulsets/buildkitd");
    assert_eq!(
        requests[0].header("content-type"),
        Some("application/strategic-merge-patch+json")
    );
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body, serde_json::json!({ "spec": { "replicas": 0 } }));
}

#[tokio::test]
async fn missing_statefulset_is_not_found() {
    let server = MockApiServer::start(
        404,
        r#"{"kind":"Status","status":"Failure","message":"statefulsets.apps \"nope\" not found","reason":"NotFound","code":404}"#,
    )
    .await;
    let client = KubernetesClient::with_base_url(&server.url()).unwrap();

    let err = client.get_status("default", "nope").await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

#[tokio::test]
async fn api_failures_carry_the_server_message() {
    let server = MockApiServer::start(
        403,
        r#"{"kind":"Status","status":"Failure","message":"statefulsets.apps is forbidden","code":403}"#,
    )
    .await;
    let client = KubernetesClient::with_base_url(&server.url()).unwrap();

    match client.set_desired_replicas("default", "buildkitd", 1).await.unwrap_err() {
        OrchestratorError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "statefulsets.apps is forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn bearer_token_is_read_from_file() {
    let server = MockApiServer::start(200, STATEFULSET).await;
    let mut token = tempfile::NamedTempFile::new().unwrap();
    writeln!(token, "s3cr3t-token").unwrap();

    let config = OrchestratorConfig {
        api_server: Some(server.url()),
        kubeconfig: None,
        token_path: Some(token.path().to_path_buf()),
        ca_cert_path: None,
        request_timeout: Duration::from_secs(5),
    };
    let client = KubernetesClient::from_config(&config).unwrap();
    client.get_status("default", "buildkitd").await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].header("authorization"), Some("Bearer s3cr3t-token"));
}

#[tokio::test]
async fn unreadable_token_is_a_credentials_error() {
    let server = MockApiServer::start(200, STATEFULSET).await;
    let config = OrchestratorConfig {
        api_server: Some(server.url()),
        token_path: Some("/nonexistent/token".into()),
        ..OrchestratorConfig::default()
    };
    let client = KubernetesClient::from_config(&config).unwrap();

    let err = client.get_status("default", "buildkitd").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Credentials(_)), "got {err:?}");
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn kubeconfig_selects_server_and_token() {
    let server = MockApiServer::start(200, STATEFULSET).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("token"), "file-token\n").unwrap();
    let kubeconfig = dir.path().join("config");
    std::fs::write(
        &kubeconfig,
        format!(
            r#"
apiVersion: v1
kind: Config
current-context: local
clusters:
- name: local
  cluster:
    server: {}
contexts:
- name: local
  context:
    cluster: local
    user: builder
users:
- name: builder
  user:
    tokenFile: token
"#,
            server.url()
        ),
    )
    .unwrap();

    let config = OrchestratorConfig {
        kubeconfig: Some(kubeconfig),
        ..OrchestratorConfig::default()
    };
    let client = KubernetesClient::from_config(&config).unwrap();
    client.get_status("default", "buildkitd").await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].path, "/apis/apps/v1/namespaces/default/statefulsets/buildkitd");
    assert_eq!(requests[0].header("authorization"), Some("Bearer file-token"));
}
