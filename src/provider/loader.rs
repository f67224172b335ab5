//! Resolves provider ids to loaded providers.
//!
//! Packages live under `<providers dir>/<id>/provider.toml`. The package
//! description is re-read on every [`ProviderLoader::load`] and nothing is
//! memoized, so rebuilding or re-configuring a provider takes effect on the
//! very next resolution without restarting the service.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::process::{resolve_program, ProcessProvider, ProviderPackage};
use super::ContentProvider;
use crate::error::{HubError, Result};

pub struct ProviderLoader {
    dir: PathBuf,
    registered: RwLock<HashMap<String, Arc<dyn ContentProvider>>>,
}

impl ProviderLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            registered: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register an in-process provider. Takes precedence over packages.
    pub fn register(&self, provider: Arc<dyn ContentProvider>) {
        let id = provider.id().to_string();
        self.registered.write().insert(id, provider);
    }

    pub fn unregister(&self, id: &str) -> bool {
        self.registered.write().remove(id).is_some()
    }

    /// Resolve `id` to its current provider.
    ///
    /// # Errors
    ///
    /// - [`HubError::ProviderNotFound`] if there is no package or built
    ///   executable for the id
    /// - [`HubError::ProviderLoad`] if the package exists but its
    ///   `provider.toml` cannot be read or parsed
    pub async fn load(&self, id: &str) -> Result<Arc<dyn ContentProvider>> {
        if !is_valid_id(id) {
            return Err(HubError::ProviderNotFound(id.to_string()));
        }

        let registered = self.registered.read().get(id).cloned();
        if let Some(provider) = registered {
            return Ok(provider);
        }

        let dir = self.dir.join(id);
        let package_path = dir.join("provider.toml");
        if !tokio::fs::try_exists(&package_path).await.unwrap_or(false) {
            return Err(HubError::ProviderNotFound(id.to_string()));
        }

        let content = tokio::fs::read_to_string(&package_path)
            .await
            .map_err(|e| load_error(id, format!("failed to read {}: {e}", package_path.display())))?;
        let package = ProviderPackage::parse(&content)
            .map_err(|e| load_error(id, format!("invalid {}: {e:#}", package_path.display())))?;

        let program = resolve_program(&dir, &package.command);
        if !tokio::fs::try_exists(&program).await.unwrap_or(false) {
            debug!(provider = %id, program = %program.display(), "package has no built executable");
            return Err(HubError::ProviderNotFound(id.to_string()));
        }

        debug!(provider = %id, program = %program.display(), "loaded provider package");
        Ok(Arc::new(ProcessProvider::new(id, dir, package)))
    }
}

fn load_error(id: &str, reason: String) -> HubError {
    HubError::ProviderLoad {
        id: id.to_string(),
        reason,
    }
}

/// Ids become directory names; keep them to a safe character set.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
