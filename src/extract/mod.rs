//! Hosting-page extractors.
//!
//! Turns an opaque hosting-page URL into a direct media URL.
//!
//! # Architecture
//!
//! - [`Extractor`]: async trait, one implementation per hosting service
//! - [`ExtractorRegistry`]: looks extractors up by the service key the
//!   [`StreamClassifier`](crate::classify::StreamClassifier) assigned
//! - [`Strategy`]: a pure parsing attempt over an already fetched page.
//!   Hosting pages change markup between template revisions, so each
//!   extractor tries a short ordered list of strategies and takes the
//!   first hit. Strategies never touch the network.
//!
//! Results are never cached; hosts hand out one-time URLs.

pub mod gdflix;
pub mod gdrive;
pub mod hubcloud;

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::HubError;
use crate::http_client::HttpClient;
use crate::model::ExtractionResult;

/// Extractor for one hosting service.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Service key (e.g. `"gdrive"`, `"hubcloud"`).
    fn service(&self) -> &'static str;

    /// Resolve `page_url` to a direct media URL.
    ///
    /// `client` carries a cookie jar private to this call.
    async fn extract(&self, page_url: &str, client: &HttpClient) -> Result<String>;
}

/// A fetched hosting page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects; base for relative links.
    pub url: Url,
    pub html: String,
}

impl Page {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    /// Fetch a page, following redirects.
    pub async fn fetch(client: &HttpClient, url: &str) -> Result<Self> {
        let response = client.fetch(url).await?;
        let final_url = response.url().clone();
        let html = response.text().await?;
        Ok(Self::new(final_url, html))
    }

    /// Resolve `href` against the page URL, keeping only http(s) targets.
    pub fn absolute(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let url = self.url.join(href).ok()?;
        matches!(url.scheme(), "http" | "https").then(|| url.to_string())
    }
}

/// One named parsing attempt.
pub struct Strategy {
    pub name: &'static str,
    pub run: fn(&Page, &Html) -> Option<String>,
}

/// Run `strategies` in order against `page`; first hit wins.
pub fn first_match(page: &Page, strategies: &[Strategy]) -> Option<String> {
    let document = Html::parse_document(&page.html);
    strategies.iter().find_map(|strategy| {
        let hit = (strategy.run)(page, &document);
        match &hit {
            Some(url) => debug!(strategy = strategy.name, %url, "strategy matched"),
            None => debug!(strategy = strategy.name, "strategy missed"),
        }
        hit
    })
}

static MEDIA_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:mp4|mkv|webm|avi|mov|m3u8)(?:$|[?#])").expect("valid media regex")
});

/// Hosts known to serve file bytes directly.
const DIRECT_HOSTS: &[&str] = &[
    "r2.dev",
    "pixeldrain.",
    "googleusercontent.com",
    "workers.dev",
    "fsl-buckets",
    "fastcdn",
];

/// Heuristic: does this URL look like media rather than another page?
pub fn looks_like_media(url: &str) -> bool {
    if MEDIA_PATH.is_match(url) {
        return true;
    }
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| DIRECT_HOSTS.iter().any(|h| host.contains(h)))
}

/// First anchor whose visible text contains one of the lowercase `labels`.
pub fn anchor_by_label(page: &Page, document: &Html, labels: &[&str]) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    document.select(&selector).find_map(|a| {
        let text = a.text().collect::<String>().to_lowercase();
        if labels.iter().any(|label| text.contains(label)) {
            a.value().attr("href").and_then(|href| page.absolute(href))
        } else {
            None
        }
    })
}

/// First anchor pointing at something [`looks_like_media`].
pub fn media_anchor(page: &Page, document: &Html) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page.absolute(href))
        .find(|url| looks_like_media(url))
}

/// Target of `<meta http-equiv="refresh" content="0;url=...">`.
pub fn meta_refresh(page: &Page, document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[http-equiv]").ok()?;
    document
        .select(&selector)
        .filter(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|m| m.value().attr("content"))
        .find_map(|content| {
            let lower = content.to_ascii_lowercase();
            let idx = lower.find("url=")?;
            let target = content[idx + 4..].trim().trim_matches(|c| c == '\'' || c == '"');
            page.absolute(target)
        })
}

/// Extractors keyed by service.
pub struct ExtractorRegistry {
    client: HttpClient,
    extractors: BTreeMap<&'static str, Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Registry with every built-in extractor.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        let mut registry = Self::empty(client);
        registry.register(Box::new(gdrive::GDriveExtractor::new()));
        registry.register(Box::new(hubcloud::HubCloudExtractor));
        registry.register(Box::new(hubcloud::VCloudExtractor));
        registry.register(Box::new(gdflix::GdFlixExtractor));
        registry
    }

    #[must_use]
    pub fn empty(client: HttpClient) -> Self {
        Self {
            client,
            extractors: BTreeMap::new(),
        }
    }

    /// Add or replace the extractor for its service key.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.insert(extractor.service(), extractor);
    }

    pub fn services(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.extractors.keys().copied()
    }

    pub fn contains(&self, service: &str) -> bool {
        self.extractors.contains_key(service)
    }

    /// Run the extractor registered for `service` on `page_url`.
    ///
    /// # Errors
    ///
    /// - [`HubError::UnknownExtractionService`] if nothing is registered
    ///   under `service`
    /// - [`HubError::ExtractionFailed`] for any network or parse failure,
    ///   including a page that loads but carries no media link
    /// - [`HubError::Cancelled`] if `cancel` fires first
    pub async fn resolve(
        &self,
        service: &str,
        page_url: &str,
        cancel: &CancellationToken,
    ) -> crate::error::Result<ExtractionResult> {
        let extractor = self
            .extractors
            .get(service)
            .ok_or_else(|| HubError::UnknownExtractionService(service.to_string()))?;

        // Cookies set while walking one hosting page stay with that walk.
        let session = self
            .client
            .with_session()
            .map_err(|e| HubError::extraction(page_url, e))?;

        let extracted = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(HubError::Cancelled { operation: "extraction" }),
            res = extractor.extract(page_url, &session) => res,
        };

        let direct_url = extracted
            .and_then(|url| validate_direct_url(&url))
            .map_err(|e| {
                warn!(service, page_url, "extraction failed: {e:#}");
                HubError::extraction(page_url, e)
            })?;

        debug!(service, page_url, %direct_url, "extracted direct url");
        Ok(ExtractionResult { direct_url })
    }
}

fn validate_direct_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).map_err(|e| anyhow!("extractor produced invalid url {raw:?}: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("extractor produced non-http url {raw:?}"));
    }
    Ok(url.to_string())
}
