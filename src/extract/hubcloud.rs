//! HubCloud / VCloud hosting pages.
//!
//! Both services share one page template. The landing page either links
//! the file directly or hands off to a download gateway, announced through
//! a `var url = '...'` script assignment, a `#download` button or a meta
//! refresh. The gateway lists the actual server buttons.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::{anchor_by_label, first_match, media_anchor, meta_refresh, Extractor, Page, Strategy};
use crate::http_client::HttpClient;

pub struct HubCloudExtractor;

pub struct VCloudExtractor;

#[async_trait]
impl Extractor for HubCloudExtractor {
    fn service(&self) -> &'static str {
        "hubcloud"
    }

    async fn extract(&self, page_url: &str, client: &HttpClient) -> Result<String> {
        extract_hub_page(page_url, client).await
    }
}

#[async_trait]
impl Extractor for VCloudExtractor {
    fn service(&self) -> &'static str {
        "vcloud"
    }

    async fn extract(&self, page_url: &str, client: &HttpClient) -> Result<String> {
        extract_hub_page(page_url, client).await
    }
}

/// Strategies that yield the file itself.
const FILE_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "server_button",
        run: server_button,
    },
    Strategy {
        name: "media_anchor",
        run: media_anchor,
    },
];

/// Strategies that yield the download gateway.
const GATEWAY_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "script_url_var",
        run: script_url_var,
    },
    Strategy {
        name: "download_button",
        run: download_button,
    },
    Strategy {
        name: "meta_refresh",
        run: meta_refresh,
    },
];

const SERVER_LABELS: &[&str] = &[
    "fsl server",
    "10gbps",
    "pixeldrain",
    "direct download",
    "download file",
];

static URL_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"var\s+url\s*=\s*['"]([^'"]+)['"]"#).expect("valid url var regex")
});

async fn extract_hub_page(page_url: &str, client: &HttpClient) -> Result<String> {
    let landing = Page::fetch(client, page_url).await?;
    if let Some(url) = first_match(&landing, FILE_STRATEGIES) {
        return Ok(url);
    }

    let gateway_url = first_match(&landing, GATEWAY_STRATEGIES)
        .ok_or_else(|| anyhow!("no media link found on page"))?;
    tracing::debug!(%gateway_url, "following download gateway");

    let gateway = Page::fetch(client, &gateway_url)
        .await
        .context("failed to load download gateway")?;
    first_match(&gateway, FILE_STRATEGIES)
        .ok_or_else(|| anyhow!("no media link found on download gateway {gateway_url}"))
}

fn server_button(page: &Page, document: &Html) -> Option<String> {
    anchor_by_label(page, document, SERVER_LABELS)
}

fn script_url_var(page: &Page, _document: &Html) -> Option<String> {
    let captures = URL_VAR.captures(&page.html)?;
    page.absolute(captures.get(1)?.as_str())
}

fn download_button(page: &Page, document: &Html) -> Option<String> {
    let selector = Selector::parse("a#download[href]").ok()?;
    let href = document.select(&selector).next()?.value().attr("href")?;
    page.absolute(href)
}
