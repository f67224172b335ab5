//! Stream relay.
//!
//! Two services for players that cannot reach a media host directly:
//!
//! - [`StreamRelay::resolve_for_playback`]: classify a link and, when it is
//!   a hosting page, run the matching extractor
//! - [`StreamRelay::relay`]: fetch a media URL with caller-chosen headers
//!   and hand back the upstream body as a stream
//!
//! The body is never buffered. Dropping the returned stream drops the
//! upstream response, which closes the upstream connection. Only the wait
//! for upstream response headers is bounded; once bytes flow there is no
//! deadline.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, ACCEPT_RANGES, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, RANGE,
};
use http::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::classify::StreamClassifier;
use crate::error::{HubError, Result};
use crate::extract::ExtractorRegistry;
use crate::fingerprint::chrome_profile;
use crate::http_client::HttpClient;
use crate::model::ExtractionResult;

/// Upstream response headers passed back to the caller.
pub static FORWARDED_HEADERS: [HeaderName; 4] = [CONTENT_TYPE, CONTENT_LENGTH, CONTENT_RANGE, ACCEPT_RANGES];

/// Upstream status, forwarded headers and body of a relayed resource.
pub struct RelayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, std::result::Result<Bytes, Infallible>>,
}

pub struct StreamRelay {
    client: HttpClient,
    classifier: Arc<StreamClassifier>,
    extractors: Arc<ExtractorRegistry>,
    connect_timeout: Duration,
}

impl StreamRelay {
    pub fn new(
        client: HttpClient,
        classifier: Arc<StreamClassifier>,
        extractors: Arc<ExtractorRegistry>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            client,
            classifier,
            extractors,
            connect_timeout,
        }
    }

    /// Relay with a browser media profile and the given connect bound.
    pub fn with_defaults(
        classifier: Arc<StreamClassifier>,
        extractors: Arc<ExtractorRegistry>,
        connect_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = HttpClient::with_profile(chrome_profile().for_media(), connect_timeout)?;
        Ok(Self::new(client, classifier, extractors, connect_timeout))
    }

    /// Direct URL for `page_url`, extracting only when the classifier asks
    /// for it.
    ///
    /// # Errors
    ///
    /// [`HubError::InvalidRequest`] for a non-http(s) URL, otherwise the
    /// errors of [`ExtractorRegistry::resolve`].
    #[instrument(skip(self, cancel), fields(url = %page_url))]
    pub async fn resolve_for_playback(&self, page_url: &str, cancel: &CancellationToken) -> Result<ExtractionResult> {
        let url = parse_http_url(page_url)?;
        match self.classifier.service_for(url.as_str()) {
            Some(service) => self.extractors.resolve(service, url.as_str(), cancel).await,
            None => {
                debug!("link is directly playable");
                Ok(ExtractionResult {
                    direct_url: page_url.trim().to_string(),
                })
            }
        }
    }

    /// Open `media_url` upstream and stream its body back.
    ///
    /// `overrides` win over the default media header set; `range` is the
    /// caller's `Range` header, forwarded as is.
    ///
    /// # Errors
    ///
    /// - [`HubError::InvalidRequest`] for a non-http(s) URL
    /// - [`HubError::RelayUpstream`] when the upstream cannot be reached,
    ///   does not answer within the connect bound, or answers non-2xx
    #[instrument(skip(self, overrides, range), fields(url = %media_url))]
    pub async fn relay(
        &self,
        media_url: &str,
        overrides: &HeaderMap,
        range: Option<&HeaderValue>,
    ) -> Result<RelayResponse> {
        let url = parse_http_url(media_url)?;
        let request_headers = upstream_headers(overrides, range);

        let pending = self.client.open_stream(url.as_str(), request_headers);
        let response = match tokio::time::timeout(self.connect_timeout, pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(relay_error(media_url, None, e.to_string())),
            Err(_) => {
                let reason = format!("no response within {}s", self.connect_timeout.as_secs());
                return Err(relay_error(media_url, None, reason));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(relay_error(
                media_url,
                Some(status.as_u16()),
                format!("upstream answered {status}"),
            ));
        }

        let mut headers = HeaderMap::new();
        for name in &FORWARDED_HEADERS {
            if let Some(value) = response.headers().get(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        debug!(%status, content_length = ?response.content_length(), "relaying upstream body");

        let url = media_url.to_string();
        let body = response
            .bytes_stream()
            .scan((), move |_, chunk| {
                futures::future::ready(match chunk {
                    Ok(bytes) => Some(Ok::<_, Infallible>(bytes)),
                    Err(e) => {
                        warn!(url = %url, "upstream stream ended early: {e}");
                        None
                    }
                })
            })
            .boxed();

        Ok(RelayResponse {
            status,
            headers,
            body,
        })
    }
}

/// Request headers for the upstream fetch. Client profile defaults apply
/// underneath these.
pub fn upstream_headers(overrides: &HeaderMap, range: Option<&HeaderValue>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    // Byte counts must match what the player asked for.
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    if let Some(range) = range {
        headers.insert(RANGE, range.clone());
    }
    for (name, value) in overrides {
        headers.insert(name.clone(), value.clone());
    }
    headers
}

/// Parse the `headers` query parameter: a JSON object of strings.
///
/// # Errors
///
/// [`HubError::InvalidRequest`] for malformed JSON, non-string values or
/// invalid header names and values.
pub fn parse_header_overrides(raw: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(headers);
    };

    let map: BTreeMap<String, String> = serde_json::from_str(raw)
        .map_err(|e| HubError::InvalidRequest(format!("headers must be a JSON object of strings: {e}")))?;

    for (name, value) in map {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HubError::InvalidRequest(format!("invalid header name {name:?}")))?;
        let header_value = HeaderValue::from_str(&value)
            .map_err(|_| HubError::InvalidRequest(format!("invalid value for header {name:?}")))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| HubError::InvalidRequest(format!("invalid url {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(HubError::InvalidRequest(format!("unsupported url scheme {:?}", url.scheme())));
    }
    Ok(url)
}

fn relay_error(url: &str, status: Option<u16>, reason: String) -> HubError {
    warn!(url, ?status, "relay upstream error: {reason}");
    HubError::RelayUpstream {
        url: url.to_string(),
        status,
        reason,
    }
}
