//! Provider output normalization.
//!
//! Providers answer with whatever JSON their scraper produced. Each
//! function here maps that JSON onto the fixed data model or reports
//! [`HubError::UpstreamMalformed`]; it never panics on unexpected input.
//! Individual entries that cannot be used (no link) are dropped rather
//! than failing the whole result.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{HubError, Result};
use crate::model::{
    Catalog, CatalogSection, ContentType, Episode, LinkListEntry, Meta, Post, PostsPage, Stream,
    StreamType,
};

/// Either shape a posts/search capability may return.
#[derive(Deserialize)]
#[serde(untagged)]
enum PostsShape {
    Bare(Vec<Value>),
    Paged {
        posts: Vec<Value>,
        #[serde(default, rename = "hasNextPage")]
        has_next_page: Value,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EpisodesShape {
    Bare(Vec<Value>),
    Wrapped { episodes: Vec<Value> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StreamsShape {
    Bare(Vec<Value>),
    Wrapped { streams: Vec<Value> },
}

fn malformed(provider: &str, operation: &'static str, reason: impl Into<String>) -> HubError {
    HubError::UpstreamMalformed {
        provider: provider.to_string(),
        operation,
        reason: reason.into(),
    }
}

fn shape<T: for<'de> Deserialize<'de>>(provider: &str, operation: &'static str, value: Value) -> Result<T> {
    let kind = json_kind(&value);
    serde_json::from_value(value)
        .map_err(|_| malformed(provider, operation, format!("unexpected {kind}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// First of `keys` holding a non-empty string (numbers are stringified).
fn text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Array of strings, or a single comma separated string.
fn string_list(value: &Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Object(_) => text(v, &["name", "title"]),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn catalog(provider: &str, value: Value) -> Result<Catalog> {
    let (sections, genres) = match value {
        Value::Array(sections) => (sections, Vec::new()),
        Value::Object(mut map) => {
            let mut take = |key: &str| match map.remove(key) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let sections = take("catalog");
            let genres = take("genres");
            (sections, genres)
        }
        other => {
            return Err(malformed(provider, "catalog", format!("unexpected {}", json_kind(&other))));
        }
    };

    Ok(Catalog {
        sections: sections.iter().filter_map(section).collect(),
        genres: genres.iter().filter_map(section).collect(),
    })
}

fn section(value: &Value) -> Option<CatalogSection> {
    Some(CatalogSection {
        title: text(value, &["title", "name"]).unwrap_or_default(),
        filter: text(value, &["filter"])?,
    })
}

pub fn posts(provider: &str, operation: &'static str, value: Value) -> Result<PostsPage> {
    let (raw, has_next_page) = match shape::<PostsShape>(provider, operation, value)? {
        PostsShape::Bare(posts) => (posts, false),
        PostsShape::Paged { posts, has_next_page } => (posts, has_next_page.as_bool().unwrap_or(false)),
    };

    let posts = raw
        .iter()
        .filter_map(|entry| {
            Some(Post {
                title: text(entry, &["title"]).unwrap_or_default(),
                image: text(entry, &["image", "poster"]).unwrap_or_default(),
                link: text(entry, &["link"])?,
                provider: provider.to_string(),
            })
        })
        .collect();

    Ok(PostsPage {
        posts,
        has_next_page,
    })
}

pub fn meta(provider: &str, value: Value) -> Result<Meta> {
    if !value.is_object() {
        return Err(malformed(provider, "meta", format!("unexpected {}", json_kind(&value))));
    }

    let link_list = match value.get("linkList") {
        Some(Value::Array(entries)) => entries.iter().filter_map(link_list_entry).collect(),
        _ => Vec::new(),
    };

    Ok(Meta {
        title: text(&value, &["title"]).unwrap_or_default(),
        image: text(&value, &["image", "poster"]).unwrap_or_default(),
        content_type: text(&value, &["type"]).map_or(ContentType::Movie, |t| ContentType::parse(&t)),
        synopsis: text(&value, &["synopsis", "description"]).unwrap_or_default(),
        tags: string_list(&value, "tags"),
        cast: string_list(&value, "cast"),
        rating: text(&value, &["rating"]),
        imdb_id: text(&value, &["imdbId", "imdb_id"]),
        link_list,
    })
}

fn link_list_entry(value: &Value) -> Option<LinkListEntry> {
    let direct_links: Vec<Episode> = match value.get("directLinks") {
        Some(Value::Array(items)) => items.iter().filter_map(episode).collect(),
        _ => Vec::new(),
    };
    let episodes_link = text(value, &["episodesLink"]);
    if episodes_link.is_none() && direct_links.is_empty() {
        return None;
    }
    Some(LinkListEntry {
        title: text(value, &["title"]).unwrap_or_default(),
        quality: text(value, &["quality"]),
        episodes_link,
        direct_links,
    })
}

fn episode(value: &Value) -> Option<Episode> {
    Some(Episode {
        title: text(value, &["title"]).unwrap_or_default(),
        link: text(value, &["link"])?,
        kind: text(value, &["type"]),
    })
}

pub fn episodes(provider: &str, value: Value) -> Result<Vec<Episode>> {
    let raw = match shape::<EpisodesShape>(provider, "episodes", value)? {
        EpisodesShape::Bare(items) | EpisodesShape::Wrapped { episodes: items } => items,
    };
    Ok(raw.iter().filter_map(episode).collect())
}

/// Streams as the provider described them; classification happens later.
pub fn streams(provider: &str, value: Value) -> Result<Vec<Stream>> {
    let raw = match shape::<StreamsShape>(provider, "stream", value)? {
        StreamsShape::Bare(items) | StreamsShape::Wrapped { streams: items } => items,
    };
    Ok(raw.iter().filter_map(|entry| stream(provider, entry)).collect())
}

fn stream(provider: &str, value: &Value) -> Option<Stream> {
    let link = text(value, &["link", "url"])?;
    let server = text(value, &["server", "name"]).unwrap_or_else(|| provider.to_string());

    let declared = text(value, &["type"]).map(|t| t.to_ascii_lowercase());
    let segmented = matches!(declared.as_deref(), Some("hls" | "m3u8"))
        || link.to_ascii_lowercase().split(['?', '#']).next().is_some_and(|path| path.ends_with(".m3u8"));

    let headers = value.get("headers").and_then(Value::as_object).map(|map| {
        map.iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect::<BTreeMap<_, _>>()
    });

    let mut stream = Stream::new(server, link);
    stream.stream_type = if segmented {
        StreamType::Segmented
    } else {
        StreamType::Progressive
    };
    stream.quality = text(value, &["quality"]);
    stream.headers = headers.filter(|h| !h.is_empty());
    Some(stream)
}
