//! API handlers.
//!
//! Each handler owns a [`CancellationToken`] guarded by a drop guard: when
//! the client disconnects, axum drops the handler future, the guard fires
//! and the in-flight provider or extractor call is told to stop.

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::header::RANGE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::AppState;
use crate::error::{HubError, Result};
use crate::model::{Catalog, ContentType, Episode, ExtractionResult, Meta, PostsPage, ProviderDescriptor, Stream};
use crate::pipeline::{federated_search, FederatedSearch};
use crate::relay::parse_header_overrides;

/// `Query` whose rejection is rendered like every other [`HubError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(HubError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejection is rendered like every other [`HubError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(HubError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub filter: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub link: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub url: Option<String>,
    pub headers: Option<String>,
}

fn scope() -> (CancellationToken, DropGuard) {
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    (cancel, guard)
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| HubError::InvalidRequest(format!("missing query parameter '{name}'")))
}

/// Page numbers start at 1; absent means 1.
fn page_number(raw: Option<&str>) -> Result<u32> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(1),
        Some(s) => match s.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(HubError::InvalidRequest(format!("invalid page {s:?}"))),
        },
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn providers(State(state): State<AppState>) -> Result<Json<Vec<ProviderDescriptor>>> {
    Ok(Json(state.manifest.get_manifest(true).await?))
}

/// Search every enabled provider.
pub async fn search_all(State(state): State<AppState>, ApiQuery(q): ApiQuery<SearchQuery>) -> Result<Json<FederatedSearch>> {
    let query = required(q.query, "query")?;
    let page = page_number(q.page.as_deref())?;
    let ids: Vec<String> = state
        .manifest
        .snapshot()
        .await?
        .enabled()
        .map(|p| p.id.clone())
        .collect();

    let (cancel, _guard) = scope();
    let found = federated_search(&state.pipeline, &state.loader, &ids, &query, page, &cancel).await;
    Ok(Json(found))
}

pub async fn catalog(State(state): State<AppState>, ApiPath(provider): ApiPath<String>) -> Result<Json<Catalog>> {
    let (cancel, _guard) = scope();
    let module = state.loader.load(&provider).await?;
    Ok(Json(state.pipeline.get_catalog(module.as_ref(), &cancel).await?))
}

pub async fn posts(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiQuery(q): ApiQuery<PostsQuery>,
) -> Result<Json<PostsPage>> {
    let filter = q.filter.unwrap_or_default();
    let page = page_number(q.page.as_deref())?;

    let (cancel, _guard) = scope();
    let module = state.loader.load(&provider).await?;
    Ok(Json(state.pipeline.get_posts(module.as_ref(), &filter, page, &cancel).await?))
}

pub async fn search(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> Result<Json<PostsPage>> {
    let query = required(q.query, "query")?;
    let page = page_number(q.page.as_deref())?;

    let (cancel, _guard) = scope();
    let module = state.loader.load(&provider).await?;
    Ok(Json(state.pipeline.search(module.as_ref(), &query, page, &cancel).await?))
}

pub async fn meta(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiQuery(q): ApiQuery<LinkQuery>,
) -> Result<Json<Meta>> {
    let link = required(q.link, "link")?;

    let (cancel, _guard) = scope();
    let module = state.loader.load(&provider).await?;
    Ok(Json(state.pipeline.get_meta(module.as_ref(), &link, &cancel).await?))
}

pub async fn episodes(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiQuery(q): ApiQuery<UrlQuery>,
) -> Result<Json<Vec<Episode>>> {
    let url = required(q.url, "url")?;

    let (cancel, _guard) = scope();
    let module = state.loader.load(&provider).await?;
    Ok(Json(state.pipeline.get_episodes(module.as_ref(), &url, &cancel).await?))
}

pub async fn streams(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiQuery(q): ApiQuery<StreamQuery>,
) -> Result<Json<Vec<Stream>>> {
    let link = required(q.link, "link")?;
    let content_type = q.content_type.as_deref().map_or(ContentType::Movie, ContentType::parse);

    let (cancel, _guard) = scope();
    let module = state.loader.load(&provider).await?;
    Ok(Json(
        state
            .pipeline
            .get_streams(module.as_ref(), &link, content_type, &cancel)
            .await?,
    ))
}

/// Extraction only; the client fetches the returned URL itself.
pub async fn proxy_stream(State(state): State<AppState>, ApiQuery(q): ApiQuery<UrlQuery>) -> Result<Json<ExtractionResult>> {
    let url = required(q.url, "url")?;
    let (cancel, _guard) = scope();
    Ok(Json(state.relay.resolve_for_playback(&url, &cancel).await?))
}

/// Relay media bytes with the caller's header overrides.
pub async fn proxy_video(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<VideoQuery>,
    request_headers: HeaderMap,
) -> Result<Response> {
    let url = required(q.url, "url")?;
    let overrides = parse_header_overrides(q.headers.as_deref())?;

    let relayed = state
        .relay
        .relay(&url, &overrides, request_headers.get(RANGE))
        .await?;

    let mut response = Body::from_stream(relayed.body).into_response();
    *response.status_mut() = relayed.status;
    response.headers_mut().extend(relayed.headers);
    Ok(response)
}
