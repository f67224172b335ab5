//! HTTP API.
//!
//! | route                              | answer                         |
//! |------------------------------------|--------------------------------|
//! | `GET /api/health`                  | `{status, version}`            |
//! | `GET /api/providers`               | enabled provider descriptors   |
//! | `GET /api/search?query=&page=`     | federated search               |
//! | `GET /api/{provider}/catalog`      | `{catalog, genres}`            |
//! | `GET /api/{provider}/posts`        | `{posts, hasNextPage}`         |
//! | `GET /api/{provider}/search`       | `{posts, hasNextPage}`         |
//! | `GET /api/{provider}/meta`         | meta                           |
//! | `GET /api/{provider}/episodes`     | episodes                       |
//! | `GET /api/{provider}/stream`       | classified streams             |
//! | `GET /api/proxy/stream?url=`       | `{streamUrl}`                  |
//! | `GET /api/proxy/video?url=&headers=` | relayed media bytes          |
//!
//! Errors are `{error, details}` with a matching status code, including
//! malformed query strings and unknown paths.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::classify::StreamClassifier;
use crate::config::HubConfig;
use crate::extract::ExtractorRegistry;
use crate::http_client::HttpClient;
use crate::manifest::ManifestRegistry;
use crate::pipeline::ResolutionPipeline;
use crate::provider::ProviderLoader;
use crate::relay::StreamRelay;

/// Shared service components.
#[derive(Clone)]
pub struct AppState {
    pub manifest: Arc<ManifestRegistry>,
    pub loader: Arc<ProviderLoader>,
    pub pipeline: Arc<ResolutionPipeline>,
    pub relay: Arc<StreamRelay>,
}

impl AppState {
    /// Wire every component from `config`.
    pub fn from_config(config: &HubConfig) -> anyhow::Result<Self> {
        let classifier = Arc::new(StreamClassifier::new());
        let pages = HttpClient::new()
            .context("failed to build HTTP client")?
            .with_fetch_timeout(config.extract_timeout());

        let manifest = ManifestRegistry::from_config(config, pages.clone());
        let loader = ProviderLoader::new(&config.providers.dir);
        let pipeline = ResolutionPipeline::new(Arc::clone(&classifier), config.provider_timeout());
        let extractors = Arc::new(ExtractorRegistry::new(pages));
        let relay = StreamRelay::with_defaults(classifier, extractors, config.relay_connect_timeout())
            .context("failed to build relay client")?;

        Ok(Self {
            manifest: Arc::new(manifest),
            loader: Arc::new(loader),
            pipeline: Arc::new(pipeline),
            relay: Arc::new(relay),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/providers", get(handlers::providers))
        .route("/api/search", get(handlers::search_all))
        .route("/api/proxy/stream", get(handlers::proxy_stream))
        .route("/api/proxy/video", get(handlers::proxy_video))
        .route("/api/{provider}/catalog", get(handlers::catalog))
        .route("/api/{provider}/posts", get(handlers::posts))
        .route("/api/{provider}/search", get(handlers::search))
        .route("/api/{provider}/meta", get(handlers::meta))
        .route("/api/{provider}/episodes", get(handlers::episodes))
        .route("/api/{provider}/stream", get(handlers::streams))
        .fallback(error::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(config: HubConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;

    match state.manifest.refresh().await {
        Ok(snapshot) => info!(
            providers = snapshot.providers.len(),
            source = ?snapshot.source,
            "manifest ready"
        ),
        Err(e) => warn!("starting without a manifest: {e}"),
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %listener.local_addr()?, providers_dir = %config.providers.dir.display(), "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
