//! Provider packages run as external executables.
//!
//! A package is a directory holding `provider.toml` and the built provider:
//!
//! ```toml
//! command = "./provider"
//! args = ["--quiet"]
//! timeout_secs = 45
//! ```
//!
//! Each operation spawns the executable once, writes one JSON request on
//! stdin and reads one JSON document from stdout. Because nothing is kept
//! between calls, a rebuilt executable is picked up by the next call.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ContentProvider, ProviderRequest};

/// Contents of `provider.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderPackage {
    /// Executable, relative to the package directory unless absolute.
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderPackage {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Runs a provider package as a [`ContentProvider`].
pub struct ProcessProvider {
    id: String,
    dir: PathBuf,
    package: ProviderPackage,
}

impl ProcessProvider {
    pub fn new(id: impl Into<String>, dir: impl Into<PathBuf>, package: ProviderPackage) -> Self {
        Self {
            id: id.into(),
            dir: dir.into(),
            package,
        }
    }

    /// Absolute path of the executable.
    pub fn program(&self) -> PathBuf {
        resolve_program(&self.dir, &self.package.command)
    }
}

pub(crate) fn resolve_program(dir: &Path, command: &Path) -> PathBuf {
    if command.is_absolute() {
        command.to_path_buf()
    } else {
        dir.join(command)
    }
}

#[async_trait]
impl ContentProvider for ProcessProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn timeout(&self) -> Option<Duration> {
        self.package.timeout_secs.map(Duration::from_secs)
    }

    async fn call(
        &self,
        request: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        let program = self.program();
        let id = &self.id;
        let input = serde_json::to_vec(request)?;
        debug!(provider = %id, op = request.operation(), "spawning provider");

        let mut child = Command::new(&program)
            .args(&self.package.args)
            .current_dir(&self.dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn provider '{id}' ({})", program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A provider that exits without reading its input is not an error
            // by itself; its exit status decides.
            if let Err(e) = stdin.write_all(&input).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e).with_context(|| format!("failed to write to provider '{id}' stdin"));
                }
            }
        }

        // Dropping `wait_with_output` drops the child, which kills it.
        let output = tokio::select! {
            out = child.wait_with_output() => out.with_context(|| format!("provider '{id}' failed"))?,
            () = cancel.cancelled() => bail!("provider '{id}' cancelled"),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("provider '{id}' exited with {}: {}", output.status, stderr.trim());
        }

        Ok(parse_output(id, &output.stdout))
    }
}

/// Unparseable output degrades to `null`, which normalizes to an empty result.
fn parse_output(id: &str, stdout: &[u8]) -> serde_json::Value {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(stdout).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&stdout[..stdout.len().min(200)]);
        warn!("provider '{id}' returned invalid JSON ({e}): {preview}");
        serde_json::Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_package() {
        let package = ProviderPackage::parse(r#"command = "./provider""#).unwrap();
        assert_eq!(package.command, PathBuf::from("./provider"));
        assert!(package.args.is_empty());
        assert!(package.timeout_secs.is_none());
    }

    #[test]
    fn parse_full_package() {
        let package = ProviderPackage::parse(
            r#"
command = "/usr/local/bin/provider-mod"
args = ["--region", "in"]
timeout_secs = 45
"#,
        )
        .unwrap();
        assert_eq!(package.args, vec!["--region", "in"]);
        let provider = ProcessProvider::new("mod", "/srv/providers/mod", package);
        assert_eq!(provider.timeout(), Some(Duration::from_secs(45)));
        assert_eq!(provider.program(), PathBuf::from("/usr/local/bin/provider-mod"));
    }

    #[test]
    fn relative_command_resolves_against_package_dir() {
        let package = ProviderPackage::parse(r#"command = "bin/run""#).unwrap();
        let provider = ProcessProvider::new("x", "/srv/providers/x", package);
        assert_eq!(provider.program(), PathBuf::from("/srv/providers/x/bin/run"));
    }

    #[test]
    fn rejects_package_without_command() {
        assert!(ProviderPackage::parse("args = []").is_err());
    }

    #[test]
    fn invalid_output_degrades_to_null() {
        assert!(parse_output("x", b"not json").is_null());
        assert!(parse_output("x", b"  \n").is_null());
        assert_eq!(parse_output("x", b"[1]"), serde_json::json!([1]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_executable_fails_to_spawn() {
        let package = ProviderPackage::parse(r#"command = "/nonexistent/provider""#).unwrap();
        let provider = ProcessProvider::new("ghost", "/tmp", package);
        let result = provider
            .call(&ProviderRequest::Catalog, &CancellationToken::new())
            .await;
        assert!(result.is_err());
    }
}
