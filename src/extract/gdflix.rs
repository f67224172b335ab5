//! GDFlix file pages.
//!
//! The file page lists several server buttons. Some link the file directly;
//! others go through a redirector that carries the real target in a `url=`
//! query parameter.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::Html;
use url::Url;

use super::{anchor_by_label, first_match, looks_like_media, media_anchor, Extractor, Page, Strategy};
use crate::http_client::HttpClient;

pub struct GdFlixExtractor;

const BUTTON_LABELS: &[&str] = &["instant dl", "cloud download", "direct dl", "fast cloud"];

const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "server_button",
        run: server_button,
    },
    Strategy {
        name: "media_anchor",
        run: media_anchor,
    },
];

#[async_trait]
impl Extractor for GdFlixExtractor {
    fn service(&self) -> &'static str {
        "gdflix"
    }

    async fn extract(&self, page_url: &str, client: &HttpClient) -> Result<String> {
        let page = Page::fetch(client, page_url).await?;
        first_match(&page, STRATEGIES).ok_or_else(|| anyhow!("no media link found on page"))
    }
}

fn server_button(page: &Page, document: &Html) -> Option<String> {
    let href = anchor_by_label(page, document, BUTTON_LABELS)?;
    unwrap_redirect(&href).or_else(|| looks_like_media(&href).then_some(href))
}

/// `https://r.example/go?url=<target>` to `<target>` when it looks like media.
fn unwrap_redirect(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let (_, target) = url.query_pairs().find(|(k, _)| k == "url")?;
    let target = target.into_owned();
    looks_like_media(&target).then_some(target)
}
