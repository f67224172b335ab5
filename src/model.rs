//! Normalized data model handed to callers.
//!
//! Providers return loosely shaped JSON; the pipeline turns it into these
//! value types (see [`crate::pipeline::normalize`]). Everything here is
//! built fresh per request and never mutated afterwards, except for the
//! classification flags on [`Stream`], which the classifier sets once
//! before the stream leaves the pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One provider entry from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    /// Content category advertised by the provider (e.g. `"global"`, `"anime"`).
    pub kind: String,
    pub version: String,
    pub enabled: bool,
}

/// Named, filterable slice of a provider's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSection {
    pub title: String,
    pub filter: String,
}

/// Catalog capability output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "catalog")]
    pub sections: Vec<CatalogSection>,
    pub genres: Vec<CatalogSection>,
}

/// One browsable item. `link` is opaque outside its originating provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub image: String,
    pub link: String,
    pub provider: String,
}

/// Listing/search output, always in object shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsPage {
    pub posts: Vec<Post>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Tv,
}

impl ContentType {
    /// Lenient parse used for provider output and query strings.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tv" | "series" | "show" => ContentType::Tv,
            _ => ContentType::Movie,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Tv => "tv",
        }
    }
}

/// Detail view of a single post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub title: String,
    pub image: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub synopsis: String,
    pub tags: Vec<String>,
    pub cast: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    pub link_list: Vec<LinkListEntry>,
}

/// One season / quality / variant of a [`Meta`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkListEntry {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Secondary link resolved through the episodes capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes_link: Option<String>,
    /// Episodes embedded directly in the meta response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub direct_links: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    pub link: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    /// Single progressive file (mp4, mkv, ...).
    #[default]
    Progressive,
    /// Segmented playlist (HLS).
    Segmented,
}

/// Terminal resolvable unit.
///
/// `requires_extraction` is true exactly when `extraction_service` is set;
/// in that case `link` points at a hosting page rather than media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub server: String,
    pub link: String,
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    pub requires_extraction: bool,
    pub extraction_service: Option<String>,
}

impl Stream {
    /// An unclassified progressive stream.
    pub fn new(server: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            link: link.into(),
            stream_type: StreamType::Progressive,
            quality: None,
            headers: None,
            requires_extraction: false,
            extraction_service: None,
        }
    }
}

/// Direct media URL produced by an extractor. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(rename = "streamUrl")]
    pub direct_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posts_page_serializes_camel_case() {
        let page = PostsPage {
            posts: vec![],
            has_next_page: true,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["hasNextPage"], true);
    }

    #[test]
    fn stream_serializes_classification_fields() {
        let json = serde_json::to_value(Stream::new("s1", "https://cdn.example.com/a.mp4")).unwrap();
        assert_eq!(json["type"], "progressive");
        assert_eq!(json["requiresExtraction"], false);
        assert!(json["extractionService"].is_null());
        assert!(json.get("quality").is_none());
    }

    #[test]
    fn content_type_parse_is_lenient() {
        assert_eq!(ContentType::parse("series"), ContentType::Tv);
        assert_eq!(ContentType::parse(" TV "), ContentType::Tv);
        assert_eq!(ContentType::parse("movie"), ContentType::Movie);
        assert_eq!(ContentType::parse("anything"), ContentType::Movie);
    }

    #[test]
    fn catalog_uses_wire_field_name() {
        let catalog = Catalog {
            sections: vec![CatalogSection {
                title: "Trending".into(),
                filter: "/trending".into(),
            }],
            genres: vec![],
        };
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["catalog"][0]["filter"], "/trending");
    }
}
