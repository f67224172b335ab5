//! Stream classification.
//!
//! Decides from a stream's URL alone whether it can be played directly or
//! points at a hosting page that one of the extractors has to resolve
//! first. The rules below are an ordered table; the first pattern that
//! matches names the extractor service. Patterns target disjoint hosts and
//! path shapes, so order only matters for readability.
//!
//! Every service named here must also be registered in
//! [`ExtractorRegistry`](crate::extract::ExtractorRegistry).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Stream;

/// Built-in `(service, pattern)` table.
pub const BUILTIN_RULES: &[(&str, &str)] = &[
    // drive.google.com/file/d/<id>/view, /open?id=<id>, /uc?export=download&id=<id>
    (
        "gdrive",
        r"(?i)^https?://drive\.google\.com/(?:file/d/[\w-]+|open\?id=[\w-]+|uc\?(?:[^#]*&)?id=[\w-]+)",
    ),
    // <mirror>.hubcloud.<tld>/<slug> and /drive/<slug>
    ("hubcloud", r"(?i)^https?://(?:[\w-]+\.)*hubcloud\.[a-z]{2,}/[^/?#]+"),
    // <mirror>.gdflix.<tld>/file/<id>
    ("gdflix", r"(?i)^https?://(?:[\w-]+\.)*gdflix\.[a-z]{2,}/file/[\w-]+"),
    // <mirror>.vcloud.<tld>/<slug> cloud download relay
    ("vcloud", r"(?i)^https?://(?:[\w-]+\.)*vcloud\.[a-z]{2,}/[^/?#]+"),
];

#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub service: String,
    pub pattern: Regex,
}

static BUILTIN: Lazy<Vec<ExtractionRule>> = Lazy::new(|| {
    BUILTIN_RULES
        .iter()
        .map(|(service, pattern)| ExtractionRule {
            service: (*service).to_string(),
            pattern: Regex::new(pattern).expect("built-in classification pattern"),
        })
        .collect()
});

/// Ordered URL-pattern table mapping hosting links to extractor services.
#[derive(Debug, Clone)]
pub struct StreamClassifier {
    rules: Vec<ExtractionRule>,
}

impl StreamClassifier {
    /// Classifier with the built-in table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: BUILTIN.clone(),
        }
    }

    /// Append a rule after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn with_rule(mut self, service: &str, pattern: &str) -> Result<Self, regex::Error> {
        self.rules.push(ExtractionRule {
            service: service.to_string(),
            pattern: Regex::new(pattern)?,
        });
        Ok(self)
    }

    /// Service keys this classifier can produce, in table order.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.service.as_str())
    }

    /// First matching service for `link`, if any.
    pub fn service_for(&self, link: &str) -> Option<&str> {
        let link = link.trim();
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(link))
            .map(|rule| rule.service.as_str())
    }

    /// Set the extraction flags on a stream. Pure; no I/O.
    #[must_use]
    pub fn classify(&self, mut stream: Stream) -> Stream {
        let service = self.service_for(&stream.link).map(str::to_string);
        stream.requires_extraction = service.is_some();
        stream.extraction_service = service;
        stream
    }
}

impl Default for StreamClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(link: &str) -> Stream {
        StreamClassifier::new().classify(Stream::new("test", link))
    }

    #[test]
    fn gdrive_file_link_requires_extraction() {
        let stream = classify("https://drive.google.com/file/d/XYZ/view");
        assert!(stream.requires_extraction);
        assert_eq!(stream.extraction_service.as_deref(), Some("gdrive"));
    }

    #[test]
    fn gdrive_alternate_shapes() {
        let classifier = StreamClassifier::new();
        assert_eq!(
            classifier.service_for("https://drive.google.com/open?id=abc_123"),
            Some("gdrive")
        );
        assert_eq!(
            classifier.service_for("https://drive.google.com/uc?export=download&id=abc"),
            Some("gdrive")
        );
        assert_eq!(classifier.service_for("https://drive.google.com/drive/my-drive"), None);
    }

    #[test]
    fn direct_media_is_playable() {
        let stream = classify("https://cdn.example.com/video.mp4");
        assert!(!stream.requires_extraction);
        assert!(stream.extraction_service.is_none());
    }

    #[test]
    fn hosting_mirrors_match() {
        let classifier = StreamClassifier::new();
        assert_eq!(classifier.service_for("https://hubcloud.cc/xyz"), Some("hubcloud"));
        assert_eq!(
            classifier.service_for("https://shared.HubCloud.one/drive/abc123"),
            Some("hubcloud")
        );
        assert_eq!(
            classifier.service_for("https://new4.gdflix.dad/file/Gx81abc"),
            Some("gdflix")
        );
        assert_eq!(classifier.service_for("https://vcloud.lol/kq9zq"), Some("vcloud"));
    }

    #[test]
    fn near_misses_are_playable() {
        let classifier = StreamClassifier::new();
        for link in [
            "https://hubcloud.cc/",
            "https://gdflix.dad/login",
            "https://nothubcloud-mirror.com/hubcloud.cc/x",
            "https://cdn.example.com/drive.google.com/file/d/x",
            "",
        ] {
            assert_eq!(classifier.service_for(link), None, "{link}");
        }
    }

    #[test]
    fn requires_extraction_iff_service_set() {
        for link in [
            "https://drive.google.com/file/d/XYZ/view",
            "https://hubcloud.cc/xyz",
            "https://example.com/a.m3u8",
            "not a url",
        ] {
            let stream = classify(link);
            assert_eq!(stream.requires_extraction, stream.extraction_service.is_some());
        }
    }

    #[test]
    fn custom_rules_extend_the_table() {
        let classifier = StreamClassifier::new()
            .with_rule("filepress", r"^https?://filepress\.[a-z]+/file/")
            .unwrap();
        assert_eq!(
            classifier.service_for("https://filepress.store/file/abc"),
            Some("filepress")
        );
        assert_eq!(classifier.services().last(), Some("filepress"));
        assert!(StreamClassifier::new().with_rule("bad", "[").is_err());
    }
}
