//! `cinehub` - content resolution hub
//!
//! Aggregates content from independently built provider modules behind one
//! API and turns hosting-page links into directly playable media URLs.
//!
//! # Features
//!
//! - **Manifest registry**: remote provider list with local fallback,
//!   cached as an atomically swapped snapshot
//! - **Provider loader**: resolves ids to provider packages on every call,
//!   so rebuilt providers are picked up without a restart
//! - **Resolution pipeline**: catalog, posts, search, meta, episodes and
//!   streams with per-stage deadlines, cancellation and normalization of
//!   whatever shape a provider returns
//! - **Classifier + extractors**: pattern table deciding which streams are
//!   hosting pages, and per-host extractors resolving them
//! - **Stream relay**: header-injecting media proxy that streams the body
//!   without buffering it
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cinehub::{ProviderLoader, ResolutionPipeline, StreamClassifier};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let loader = ProviderLoader::new("/srv/cinehub/providers");
//!     let pipeline = ResolutionPipeline::new(
//!         Arc::new(StreamClassifier::new()),
//!         std::time::Duration::from_secs(30),
//!     );
//!     let cancel = CancellationToken::new();
//!
//!     let provider = loader.load("mod").await?;
//!     let page = pipeline.get_posts(provider.as_ref(), "/latest", 1, &cancel).await?;
//!     let link = &page.posts[0].link;
//!     let meta = pipeline.get_meta(provider.as_ref(), link, &cancel).await?;
//!     let streams = pipeline
//!         .get_streams(provider.as_ref(), link, meta.content_type, &cancel)
//!         .await?;
//!     println!("{} streams", streams.len());
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod http_client;
pub mod manifest;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod relay;
pub mod server;

pub use classify::StreamClassifier;
pub use config::HubConfig;
pub use error::{HubError, Result};
pub use extract::{Extractor, ExtractorRegistry};
pub use fingerprint::{chrome_profile, firefox_profile, random_profile, BrowserProfile};
pub use http_client::HttpClient;
pub use manifest::{ManifestRegistry, ManifestSnapshot, ManifestSource};
pub use model::{
    Catalog, CatalogSection, ContentType, Episode, ExtractionResult, LinkListEntry, Meta, Post, PostsPage,
    ProviderDescriptor, Stream, StreamType,
};
pub use pipeline::{federated_search, FederatedSearch, ResolutionPipeline};
pub use provider::{ContentProvider, ProviderLoader, ProviderRequest};
pub use relay::StreamRelay;

/// Version of cinehub
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
