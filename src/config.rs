//! Service configuration loaded from `~/.config/cinehub/config.toml`.
//!
//! ```toml
//! bind = "0.0.0.0:3001"
//!
//! [manifest]
//! url = "https://example.org/providers/manifest.json"
//! fallback = "/srv/cinehub/manifest.json"
//! timeout_secs = 10
//!
//! [providers]
//! dir = "/srv/cinehub/providers"
//! timeout_secs = 30
//!
//! [extract]
//! timeout_secs = 20
//!
//! [relay]
//! connect_timeout_secs = 10
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub bind: SocketAddr,
    pub manifest: ManifestConfig,
    pub providers: ProvidersConfig,
    pub extract: ExtractConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Remote manifest; when unset only the fallback file is used.
    pub url: Option<String>,
    /// Local copy produced by the provider build; defaults to
    /// `<providers dir>/manifest.json`.
    pub fallback: Option<PathBuf>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub dir: PathBuf,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub connect_timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3001)),
            manifest: ManifestConfig::default(),
            providers: ProvidersConfig::default(),
            extract: ExtractConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            url: None,
            fallback: None,
            timeout_secs: 10,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            dir: config_dir().join("providers"),
            timeout_secs: 30,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { timeout_secs: 20 }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
        }
    }
}

impl HubConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(default_path, Path::to_path_buf);
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Effective local fallback manifest path.
    pub fn manifest_fallback(&self) -> PathBuf {
        self.manifest
            .fallback
            .clone()
            .unwrap_or_else(|| self.providers.dir.join("manifest.json"))
    }

    pub fn manifest_timeout(&self) -> Duration {
        Duration::from_secs(self.manifest.timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.timeout_secs)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract.timeout_secs)
    }

    pub fn relay_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.relay.connect_timeout_secs)
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cinehub")
}

/// Return the path to the default config file.
pub fn default_path() -> PathBuf {
    config_dir().join("config.toml")
}
