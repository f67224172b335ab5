//! Resolution pipeline.
//!
//! Runs one capability of a loaded provider with a deadline and the
//! caller's cancellation token, then normalizes the raw output into the
//! data model. Streams additionally pass through the classifier so every
//! returned [`Stream`] says whether it needs extraction.
//!
//! Failure policy:
//! - a provider that errors, times out or is cancelled fails only that
//!   operation ([`HubError::ProviderCall`], [`HubError::StageTimeout`],
//!   [`HubError::Cancelled`])
//! - a provider that answers in an unexpected shape yields an empty result
//!   and a warning, never an error

pub mod federated;
pub mod normalize;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::classify::StreamClassifier;
use crate::error::{HubError, Result};
use crate::model::{Catalog, ContentType, Episode, Meta, PostsPage, Stream};
use crate::provider::{ContentProvider, ProviderRequest};

pub use federated::{federated_search, FederatedSearch, ProviderFailure, ProviderResults};

/// Default deadline for one provider operation.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ResolutionPipeline {
    classifier: Arc<StreamClassifier>,
    timeout: Duration,
}

impl ResolutionPipeline {
    pub fn new(classifier: Arc<StreamClassifier>, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }

    pub fn classifier(&self) -> &StreamClassifier {
        &self.classifier
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one provider call under the stage deadline and `cancel`.
    async fn invoke(
        &self,
        provider: &dyn ContentProvider,
        request: ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let operation = request.operation();
        let limit = provider.timeout().unwrap_or(self.timeout);
        let child = cancel.child_token();

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(HubError::Cancelled { operation }),
            res = tokio::time::timeout(limit, provider.call(&request, &child)) => res,
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(provider = provider.id(), operation, "provider call failed: {e:#}");
                Err(HubError::ProviderCall {
                    provider: provider.id().to_string(),
                    operation,
                    reason: format!("{e:#}"),
                })
            }
            Err(_) => {
                child.cancel();
                warn!(provider = provider.id(), operation, ?limit, "provider call timed out");
                Err(HubError::StageTimeout {
                    provider: provider.id().to_string(),
                    operation,
                    secs: limit.as_secs(),
                })
            }
        }
    }

    #[instrument(skip_all, fields(provider = provider.id()))]
    pub async fn get_catalog(&self, provider: &dyn ContentProvider, cancel: &CancellationToken) -> Result<Catalog> {
        let raw = self.invoke(provider, ProviderRequest::Catalog, cancel).await?;
        degrade(normalize::catalog(provider.id(), raw))
    }

    #[instrument(skip(self, provider, cancel), fields(provider = provider.id()))]
    pub async fn get_posts(
        &self,
        provider: &dyn ContentProvider,
        filter: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<PostsPage> {
        let request = ProviderRequest::Posts {
            filter: filter.to_string(),
            page,
        };
        let raw = self.invoke(provider, request, cancel).await?;
        degrade(normalize::posts(provider.id(), "posts", raw))
    }

    #[instrument(skip(self, provider, cancel), fields(provider = provider.id()))]
    pub async fn search(
        &self,
        provider: &dyn ContentProvider,
        query: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<PostsPage> {
        let request = ProviderRequest::Search {
            query: query.to_string(),
            page,
        };
        let raw = self.invoke(provider, request, cancel).await?;
        degrade(normalize::posts(provider.id(), "search", raw))
    }

    #[instrument(skip(self, provider, cancel), fields(provider = provider.id()))]
    pub async fn get_meta(&self, provider: &dyn ContentProvider, link: &str, cancel: &CancellationToken) -> Result<Meta> {
        let request = ProviderRequest::Meta {
            link: link.to_string(),
        };
        let raw = self.invoke(provider, request, cancel).await?;
        degrade(normalize::meta(provider.id(), raw))
    }

    #[instrument(skip(self, provider, cancel), fields(provider = provider.id()))]
    pub async fn get_episodes(
        &self,
        provider: &dyn ContentProvider,
        episodes_link: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Episode>> {
        let request = ProviderRequest::Episodes {
            url: episodes_link.to_string(),
        };
        let raw = self.invoke(provider, request, cancel).await?;
        degrade(normalize::episodes(provider.id(), raw))
    }

    /// Candidate streams for `link`, each classified.
    #[instrument(skip(self, provider, cancel), fields(provider = provider.id()))]
    pub async fn get_streams(
        &self,
        provider: &dyn ContentProvider,
        link: &str,
        content_type: ContentType,
        cancel: &CancellationToken,
    ) -> Result<Vec<Stream>> {
        let request = ProviderRequest::Stream {
            link: link.to_string(),
            content_type: content_type.as_str().to_string(),
        };
        let raw = self.invoke(provider, request, cancel).await?;
        let streams = degrade(normalize::streams(provider.id(), raw))?;

        let streams: Vec<Stream> = streams
            .into_iter()
            .map(|stream| self.classifier.classify(stream))
            .collect();
        debug!(
            total = streams.len(),
            needs_extraction = streams.iter().filter(|s| s.requires_extraction).count(),
            "streams classified"
        );
        Ok(streams)
    }
}

/// Malformed provider output becomes an empty result.
fn degrade<T: Default>(result: Result<T>) -> Result<T> {
    match result {
        Err(e @ HubError::UpstreamMalformed { .. }) => {
            warn!("{e}; returning empty result");
            Ok(T::default())
        }
        other => other,
    }
}
