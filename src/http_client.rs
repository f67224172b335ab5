//! Shared upstream HTTP client
//!
//! Features:
//! - HTTP/2 negotiation with keep-alive connection pooling
//! - TLS 1.3 via rustls
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - Browser fingerprint default headers
//! - Bounded connect phase, no global request timeout: page fetches carry
//!   their own deadline, media relays stream for as long as playback lasts

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use tracing::{debug, instrument};

use crate::fingerprint::{random_profile, BrowserProfile};

/// Default deadline for page/API fetches that do not stream.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Cloneable handle to one pooled client.
///
/// The shared client keeps no cookies. Flows that need cookies to carry
/// from one page to the next take a private jar with
/// [`with_session`](Self::with_session).
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    profile: BrowserProfile,
    connect_timeout: Duration,
    fetch_timeout: Duration,
}

impl HttpClient {
    /// Create a client with a random browser profile and a 10s connect bound.
    pub fn new() -> Result<Self> {
        Self::with_profile(random_profile(), Duration::from_secs(10))
    }

    /// Create a client with a specific profile and connect timeout.
    pub fn with_profile(profile: BrowserProfile, connect_timeout: Duration) -> Result<Self> {
        let client = build_client(&profile, connect_timeout, None)?;
        Ok(Self {
            client,
            profile,
            connect_timeout,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        })
    }

    /// Same settings, backed by a fresh cookie jar that only this handle
    /// and its clones see.
    pub fn with_session(&self) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        Ok(Self {
            client: build_client(&self.profile, self.connect_timeout, Some(jar))?,
            profile: self.profile.clone(),
            connect_timeout: self.connect_timeout,
            fetch_timeout: self.fetch_timeout,
        })
    }

    /// Override the per-request deadline used by [`fetch`](Self::fetch).
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// GET a page with the fetch deadline, failing on non-2xx.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<Response> {
        debug!("fetching page");
        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await?;

        debug!(status = %response.status(), final_url = %response.url(), "response received");
        if !response.status().is_success() {
            bail!("{url} returned HTTP {}", response.status());
        }
        Ok(response)
    }

    /// Open a streaming GET without a request deadline.
    ///
    /// `headers` are applied on top of the client's default profile, so a
    /// caller-supplied value always wins over the default for that name.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn open_stream(&self, url: &str, headers: HeaderMap) -> reqwest::Result<Response> {
        debug!(overrides = headers.len(), "opening upstream stream");
        self.client.get(url).headers(headers).send().await
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn build_client(profile: &BrowserProfile, connect_timeout: Duration, jar: Option<Arc<Jar>>) -> Result<Client> {
    let mut builder = Client::builder()
        .http2_adaptive_window(true)
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .use_rustls_tls()
        .brotli(true)
        .zstd(true)
        .gzip(true)
        .deflate(true)
        .default_headers(profile.to_headers())
        .connect_timeout(connect_timeout)
        .redirect(reqwest::redirect::Policy::limited(10));
    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }
    Ok(builder.build()?)
}
