//! Google Drive share links.
//!
//! `uc?export=download` either redirects straight to the file or, for files
//! too large to virus-scan, answers with an HTML interstitial that carries a
//! confirmation form. Both cases end in a googleusercontent URL.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use url::Url;

use super::{first_match, Extractor, Page, Strategy};
use crate::http_client::HttpClient;

const DEFAULT_BASE: &str = "https://drive.google.com";
const USERCONTENT_DOWNLOAD: &str = "https://drive.usercontent.google.com/download";

pub struct GDriveExtractor {
    base: String,
}

impl GDriveExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base(DEFAULT_BASE)
    }

    /// Point at a different Drive host.
    #[must_use]
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for GDriveExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for GDriveExtractor {
    fn service(&self) -> &'static str {
        "gdrive"
    }

    async fn extract(&self, page_url: &str, client: &HttpClient) -> Result<String> {
        let id = file_id(page_url).ok_or_else(|| anyhow!("no drive file id in {page_url}"))?;
        let download_url = format!("{}/uc?export=download&id={id}", self.base);

        let response = client.fetch(&download_url).await?;
        let final_url = response.url().clone();
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));

        if !is_html {
            tracing::debug!(%final_url, "drive served file without interstitial");
            return Ok(final_url.to_string());
        }

        let page = Page::new(final_url, response.text().await?);
        first_match(&page, CONFIRM_STRATEGIES)
            .ok_or_else(|| anyhow!("no download link found for drive file {id}"))
    }
}

static FILE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:/file/d/|[?&]id=)([\w-]+)").expect("valid drive id regex")
});

static CONFIRM_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"confirm=([\w-]+)").expect("valid confirm regex"));

/// Drive file id from any supported share link shape.
pub fn file_id(link: &str) -> Option<&str> {
    FILE_ID
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

const CONFIRM_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "download_form",
        run: download_form,
    },
    Strategy {
        name: "confirm_token",
        run: confirm_token,
    },
    Strategy {
        name: "uc_download_link",
        run: uc_download_link,
    },
];

/// `<form id="download-form" action=...>` with its hidden inputs as query.
fn download_form(page: &Page, document: &Html) -> Option<String> {
    let form_sel = Selector::parse("form#download-form").ok()?;
    let input_sel = Selector::parse("input[type=hidden][name]").ok()?;

    let form = document.select(&form_sel).next()?;
    let action = page.absolute(form.value().attr("action")?)?;
    let mut url = Url::parse(&action).ok()?;
    {
        let mut query = url.query_pairs_mut();
        for input in form.select(&input_sel) {
            let name = input.value().attr("name").unwrap_or_default();
            let value = input.value().attr("value").unwrap_or_default();
            query.append_pair(name, value);
        }
    }
    Some(url.to_string())
}

/// Older interstitials embed `confirm=<token>` in a link or script.
fn confirm_token(page: &Page, _document: &Html) -> Option<String> {
    let token = CONFIRM_TOKEN.captures(&page.html)?.get(1)?.as_str();
    let id = page
        .url
        .query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())?;
    let mut url = Url::parse(USERCONTENT_DOWNLOAD).ok()?;
    url.query_pairs_mut()
        .append_pair("id", &id)
        .append_pair("export", "download")
        .append_pair("confirm", token);
    Some(url.to_string())
}

fn uc_download_link(page: &Page, document: &Html) -> Option<String> {
    let selector = Selector::parse("a#uc-download-link[href]").ok()?;
    let href = document.select(&selector).next()?.value().attr("href")?;
    page.absolute(href)
}
