//! Provider capability contract.
//!
//! A provider is an independently built module that knows how to browse one
//! content source. It answers [`ProviderRequest`]s with loosely shaped JSON;
//! turning that JSON into the fixed data model is the pipeline's job, so a
//! provider never has to be trusted to get the shape right.
//!
//! Providers are resolved by [`ProviderLoader`] either from an in-process
//! registration or from an on-disk package run as a subprocess
//! ([`ProcessProvider`]).

pub mod loader;
pub mod process;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub use loader::ProviderLoader;
pub use process::{ProcessProvider, ProviderPackage};

/// One capability invocation, serialized as `{"op": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ProviderRequest {
    Catalog,
    Posts {
        filter: String,
        page: u32,
    },
    Search {
        query: String,
        page: u32,
    },
    Meta {
        link: String,
    },
    Episodes {
        url: String,
    },
    Stream {
        link: String,
        #[serde(rename = "type")]
        content_type: String,
    },
}

impl ProviderRequest {
    /// Operation name used in logs and errors.
    pub fn operation(&self) -> &'static str {
        match self {
            ProviderRequest::Catalog => "catalog",
            ProviderRequest::Posts { .. } => "posts",
            ProviderRequest::Search { .. } => "search",
            ProviderRequest::Meta { .. } => "meta",
            ProviderRequest::Episodes { .. } => "episodes",
            ProviderRequest::Stream { .. } => "stream",
        }
    }
}

/// A loaded provider module.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Provider id as listed in the manifest (e.g. `"mod"`, `"dooflix"`).
    fn id(&self) -> &str;

    /// Per-provider deadline overriding the pipeline default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Run one capability and return the provider's raw output.
    ///
    /// Implementations should stop work promptly once `cancel` fires; the
    /// pipeline stops waiting either way.
    async fn call(&self, request: &ProviderRequest, cancel: &CancellationToken) -> Result<serde_json::Value>;
}
