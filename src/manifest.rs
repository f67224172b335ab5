//! Provider manifest registry.
//!
//! The manifest is fetched from a remote URL with a bounded timeout. If that
//! fails (timeout, non-2xx, malformed body) the locally persisted copy is
//! used instead. Whatever was served last is kept as an immutable
//! [`ManifestSnapshot`] behind an `Arc`; a refresh swaps in a new snapshot
//! and readers holding the old one keep a consistent view.
//!
//! There is no retry or backoff: callers re-invoke on their own schedule.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::http_client::HttpClient;
use crate::model::ProviderDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSource {
    Remote,
    Fallback,
}

/// One complete, never-edited manifest.
#[derive(Debug, Clone)]
pub struct ManifestSnapshot {
    pub providers: Vec<ProviderDescriptor>,
    pub fetched_at: DateTime<Utc>,
    pub source: ManifestSource,
}

impl ManifestSnapshot {
    pub fn enabled(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.iter().filter(|p| p.enabled)
    }
}

pub struct ManifestRegistry {
    client: HttpClient,
    remote_url: Option<String>,
    fallback_path: PathBuf,
    timeout: Duration,
    current: RwLock<Option<Arc<ManifestSnapshot>>>,
}

impl ManifestRegistry {
    pub fn new(
        client: HttpClient,
        remote_url: Option<String>,
        fallback_path: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            remote_url,
            fallback_path,
            timeout,
            current: RwLock::new(None),
        }
    }

    pub fn from_config(config: &HubConfig, client: HttpClient) -> Self {
        Self::new(
            client,
            config.manifest.url.clone(),
            config.manifest_fallback(),
            config.manifest_timeout(),
        )
    }

    /// Last served snapshot, without any I/O.
    pub fn current(&self) -> Option<Arc<ManifestSnapshot>> {
        self.current.read().clone()
    }

    /// Cached snapshot, fetching only when nothing has been loaded yet.
    pub async fn snapshot(&self) -> Result<Arc<ManifestSnapshot>> {
        match self.current() {
            Some(snapshot) => Ok(snapshot),
            None => self.refresh().await,
        }
    }

    /// Fetch the manifest, optionally keeping only enabled providers.
    ///
    /// # Errors
    ///
    /// [`HubError::ManifestUnavailable`] when neither the remote manifest nor
    /// the local fallback could be read.
    pub async fn get_manifest(&self, enabled_only: bool) -> Result<Vec<ProviderDescriptor>> {
        let snapshot = self.refresh().await?;
        Ok(if enabled_only {
            snapshot.enabled().cloned().collect()
        } else {
            snapshot.providers.clone()
        })
    }

    /// Re-read the manifest and replace the cached snapshot.
    pub async fn refresh(&self) -> Result<Arc<ManifestSnapshot>> {
        let mut remote_failure = None;

        if let Some(url) = &self.remote_url {
            match self.fetch_remote(url).await {
                Ok(providers) => {
                    info!(count = providers.len(), "loaded remote manifest");
                    return Ok(self.install(providers, ManifestSource::Remote));
                }
                Err(e) => {
                    warn!("remote manifest {url} failed: {e:#}");
                    remote_failure = Some(format!("{e:#}"));
                }
            }
        }

        match self.read_fallback().await {
            Ok(providers) => {
                info!(
                    count = providers.len(),
                    path = %self.fallback_path.display(),
                    "loaded fallback manifest"
                );
                Ok(self.install(providers, ManifestSource::Fallback))
            }
            Err(e) => {
                let reason = match remote_failure {
                    Some(remote) => format!("remote: {remote}; fallback: {e:#}"),
                    None => format!("no remote configured; fallback: {e:#}"),
                };
                Err(HubError::ManifestUnavailable(reason))
            }
        }
    }

    fn install(
        &self,
        providers: Vec<ProviderDescriptor>,
        source: ManifestSource,
    ) -> Arc<ManifestSnapshot> {
        let snapshot = Arc::new(ManifestSnapshot {
            providers,
            fetched_at: Utc::now(),
            source,
        });
        *self.current.write() = Some(Arc::clone(&snapshot));
        snapshot
    }

    async fn fetch_remote(&self, url: &str) -> anyhow::Result<Vec<ProviderDescriptor>> {
        debug!(timeout = ?self.timeout, "fetching remote manifest");
        let response = self
            .client
            .inner()
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .context("request failed")?;

        if !response.status().is_success() {
            bail!("HTTP {}", response.status());
        }

        let body = response.bytes().await.context("body read failed")?;
        parse_manifest(&body)
    }

    async fn read_fallback(&self) -> anyhow::Result<Vec<ProviderDescriptor>> {
        let body = tokio::fs::read(&self.fallback_path)
            .await
            .with_context(|| format!("failed to read {}", self.fallback_path.display()))?;
        parse_manifest(&body)
    }
}

/// Manifest entry as published; accepts the spellings found in the wild.
#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(alias = "value")]
    id: String,
    #[serde(default, alias = "displayName", alias = "name")]
    display_name: Option<String>,
    #[serde(default, alias = "type")]
    kind: Option<String>,
    #[serde(default)]
    version: Option<serde_json::Value>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    disabled: Option<bool>,
}

impl RawDescriptor {
    fn into_descriptor(self) -> Option<ProviderDescriptor> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return None;
        }
        let version = match self.version {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Some(ProviderDescriptor {
            display_name: self.display_name.unwrap_or_else(|| id.clone()),
            kind: self.kind.unwrap_or_default(),
            version,
            enabled: self.enabled.unwrap_or(!self.disabled.unwrap_or(false)),
            id,
        })
    }
}

/// Parse a manifest body: a JSON array of descriptor objects.
///
/// Individual entries that are not valid descriptors are skipped.
pub fn parse_manifest(body: &[u8]) -> anyhow::Result<Vec<ProviderDescriptor>> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_slice(body).context("manifest is not a JSON array")?;

    let providers = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<RawDescriptor>(entry) {
            Ok(raw) => raw.into_descriptor(),
            Err(e) => {
                warn!("skipping manifest entry: {e}");
                None
            }
        })
        .collect();
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_spellings() {
        let body = br#"[
            {"value": "mod", "display_name": "Mod", "type": "global", "version": "1.2.0", "disabled": false},
            {"id": "anime", "displayName": "Anime", "kind": "anime", "version": 3, "enabled": false}
        ]"#;
        let providers = parse_manifest(body).unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].id, "mod");
        assert_eq!(providers[0].display_name, "Mod");
        assert!(providers[0].enabled);
        assert_eq!(providers[1].version, "3");
        assert!(!providers[1].enabled);
    }

    #[test]
    fn skips_invalid_entries() {
        let body = br#"[{"value": "ok"}, {"display_name": "no id"}, {"value": "  "}, 42]"#;
        let providers = parse_manifest(body).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].display_name, "ok");
    }

    #[test]
    fn rejects_non_array_body() {
        assert!(parse_manifest(br#"{"providers": []}"#).is_err());
        assert!(parse_manifest(b"<html>").is_err());
    }

    #[tokio::test]
    async fn missing_remote_and_fallback_is_unavailable() {
        let registry = ManifestRegistry::new(
            HttpClient::new().unwrap(),
            None,
            PathBuf::from("/nonexistent/manifest.json"),
            Duration::from_secs(1),
        );
        let err = registry.get_manifest(true).await.unwrap_err();
        assert!(matches!(err, HubError::ManifestUnavailable(_)));
        assert!(registry.current().is_none());
    }
}
