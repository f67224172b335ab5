//! Manifest registry against a local upstream and fallback file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use cinehub::{HttpClient, ManifestRegistry, ManifestSource};

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route(
            "/slow.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!([]))
            }),
        )
        .route(
            "/manifest.json",
            get(|| async {
                Json(json!([
                    {"value": "remote-a", "display_name": "Remote A", "type": "global", "version": "2.0.0"},
                    {"value": "remote-b", "display_name": "Remote B", "type": "global", "version": "1.0.0", "disabled": true}
                ]))
            }),
        )
        .route("/broken.json", get(|| async { "<html>maintenance</html>" }))
        .route("/error.json", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fallback(dir: &tempfile::TempDir, entries: &Value) -> PathBuf {
    let path = dir.path().join("manifest.json");
    std::fs::write(&path, entries.to_string()).unwrap();
    path
}

fn three_local() -> Value {
    json!([
        {"value": "local-a", "display_name": "Local A", "type": "global", "version": "1"},
        {"value": "local-b", "display_name": "Local B", "type": "anime", "version": "1"},
        {"value": "local-c", "display_name": "Local C", "type": "global", "version": "1", "disabled": true}
    ])
}

#[tokio::test]
async fn remote_timeout_falls_back_to_local_copy() {
    let addr = spawn_upstream().await;
    let dir = tempfile::tempdir().unwrap();
    let registry = ManifestRegistry::new(
        HttpClient::new().unwrap(),
        Some(format!("http://{addr}/slow.json")),
        fallback(&dir, &three_local()),
        Duration::from_millis(200),
    );

    let providers = registry.get_manifest(false).await.unwrap();
    let ids: Vec<_> = providers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["local-a", "local-b", "local-c"]);
    assert_eq!(registry.current().unwrap().source, ManifestSource::Fallback);
}

#[tokio::test]
async fn enabled_only_filters_disabled_entries() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ManifestRegistry::new(
        HttpClient::new().unwrap(),
        None,
        fallback(&dir, &three_local()),
        Duration::from_secs(1),
    );
    let providers = registry.get_manifest(true).await.unwrap();
    assert_eq!(providers.len(), 2);
    assert!(providers.iter().all(|p| p.enabled));
}

#[tokio::test]
async fn remote_success_replaces_snapshot() {
    let addr = spawn_upstream().await;
    let dir = tempfile::tempdir().unwrap();
    let registry = ManifestRegistry::new(
        HttpClient::new().unwrap(),
        Some(format!("http://{addr}/manifest.json")),
        fallback(&dir, &three_local()),
        Duration::from_secs(2),
    );

    let enabled = registry.get_manifest(true).await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].id, "remote-a");
    assert_eq!(enabled[0].version, "2.0.0");

    let first = registry.current().unwrap();
    assert_eq!(first.source, ManifestSource::Remote);
    assert_eq!(first.providers.len(), 2);

    registry.refresh().await.unwrap();
    let second = registry.current().unwrap();
    assert!(second.fetched_at >= first.fetched_at);
    // Old readers keep their own consistent copy.
    assert_eq!(first.providers.len(), 2);
}

#[tokio::test]
async fn malformed_or_failing_remote_uses_fallback() {
    let addr = spawn_upstream().await;
    for path in ["broken.json", "error.json"] {
        let dir = tempfile::tempdir().unwrap();
        let registry = ManifestRegistry::new(
            HttpClient::new().unwrap(),
            Some(format!("http://{addr}/{path}")),
            fallback(&dir, &three_local()),
            Duration::from_secs(2),
        );
        assert_eq!(registry.get_manifest(false).await.unwrap().len(), 3, "{path}");
    }
}

#[tokio::test]
async fn both_sources_failing_is_unavailable() {
    let addr = spawn_upstream().await;
    let dir = tempfile::tempdir().unwrap();
    let registry = ManifestRegistry::new(
        HttpClient::new().unwrap(),
        Some(format!("http://{addr}/error.json")),
        dir.path().join("absent.json"),
        Duration::from_secs(2),
    );
    let err = registry.get_manifest(true).await.unwrap_err();
    assert_eq!(err.code(), "manifest_unavailable");
    assert!(err.to_string().contains("remote"));
}

#[tokio::test]
async fn snapshot_reuses_cached_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let path = fallback(&dir, &three_local());
    let registry = ManifestRegistry::new(HttpClient::new().unwrap(), None, path.clone(), Duration::from_secs(1));

    let first = registry.snapshot().await.unwrap();
    std::fs::remove_file(&path).unwrap();

    let second = registry.snapshot().await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(registry.refresh().await.is_err());
}
