//! Error taxonomy shared by the manifest registry, provider loader,
//! resolution pipeline, extractors and relay.
//!
//! Component internals use `anyhow` with context; failures are converted
//! into a [`HubError`] at the component boundary so the HTTP layer can map
//! each kind onto a status code and a stable machine-readable code.

use thiserror::Error;

/// Boxed cause carried by [`HubError::ExtractionFailed`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum HubError {
    /// Both the remote manifest and the local fallback failed.
    #[error("provider manifest unavailable: {0}")]
    ManifestUnavailable(String),

    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("provider '{id}' failed to load: {reason}")]
    ProviderLoad { id: String, reason: String },

    /// The provider itself reported an error or crashed.
    #[error("provider '{provider}' failed during {operation}: {reason}")]
    ProviderCall {
        provider: String,
        operation: &'static str,
        reason: String,
    },

    #[error("provider '{provider}' timed out during {operation} after {secs}s")]
    StageTimeout {
        provider: String,
        operation: &'static str,
        secs: u64,
    },

    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },

    /// The provider answered, but not in a shape we understand.
    /// Degraded to an empty result by the pipeline.
    #[error("provider '{provider}' returned malformed {operation} output: {reason}")]
    UpstreamMalformed {
        provider: String,
        operation: &'static str,
        reason: String,
    },

    #[error("extraction failed for {url}: {source}")]
    ExtractionFailed {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("unknown extraction service: {0}")]
    UnknownExtractionService(String),

    #[error("relay upstream error for {url}: {reason}")]
    RelayUpstream {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl HubError {
    /// Stable snake_case code sent to clients in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            HubError::ManifestUnavailable(_) => "manifest_unavailable",
            HubError::ProviderNotFound(_) => "provider_not_found",
            HubError::ProviderLoad { .. } => "provider_load_error",
            HubError::ProviderCall { .. } => "provider_failed",
            HubError::StageTimeout { .. } => "provider_timeout",
            HubError::Cancelled { .. } => "cancelled",
            HubError::UpstreamMalformed { .. } => "upstream_malformed",
            HubError::ExtractionFailed { .. } => "extraction_failed",
            HubError::UnknownExtractionService(_) => "unknown_extraction_service",
            HubError::RelayUpstream { .. } => "relay_upstream_error",
            HubError::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Wrap any extractor failure, keeping the original cause.
    pub fn extraction(url: &str, source: impl Into<BoxError>) -> Self {
        HubError::ExtractionFailed {
            url: url.to_string(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
