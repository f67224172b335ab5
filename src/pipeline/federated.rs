//! Search across several providers at once.
//!
//! Every provider is loaded and searched concurrently. A failing provider
//! lands in `failures` and never cancels or hides its siblings' results.

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::ResolutionPipeline;
use crate::error::Result;
use crate::model::{Post, PostsPage};
use crate::provider::ProviderLoader;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FederatedSearch {
    pub results: Vec<ProviderResults>,
    pub failures: Vec<ProviderFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResults {
    pub provider: String,
    pub posts: Vec<Post>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    /// Machine code of the failure, as in error responses.
    pub error: String,
    pub details: String,
}

/// Search `query` on every provider in `ids`.
///
/// Results keep the order of `ids`. Providers that answer with no posts
/// still appear in `results`, so "no results" stays distinguishable from
/// "provider failed".
#[instrument(skip(pipeline, loader, ids, cancel), fields(providers = ids.len()))]
pub async fn federated_search(
    pipeline: &ResolutionPipeline,
    loader: &ProviderLoader,
    ids: &[String],
    query: &str,
    page: u32,
    cancel: &CancellationToken,
) -> FederatedSearch {
    let searches = ids.iter().map(|id| async move {
        let outcome: Result<PostsPage> = async {
            let provider = loader.load(id).await?;
            pipeline.search(provider.as_ref(), query, page, cancel).await
        }
        .await;
        (id, outcome)
    });

    let mut aggregate = FederatedSearch::default();
    for (id, outcome) in join_all(searches).await {
        match outcome {
            Ok(found) => aggregate.results.push(ProviderResults {
                provider: id.clone(),
                posts: found.posts,
                has_next_page: found.has_next_page,
            }),
            Err(e) => aggregate.failures.push(ProviderFailure {
                provider: id.clone(),
                error: e.code().to_string(),
                details: e.to_string(),
            }),
        }
    }

    info!(
        succeeded = aggregate.results.len(),
        failed = aggregate.failures.len(),
        "federated search finished"
    );
    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::StreamClassifier;
    use crate::provider::{ContentProvider, ProviderRequest};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    struct Named {
        id: &'static str,
        answer: Option<Value>,
    }

    #[async_trait]
    impl ContentProvider for Named {
        fn id(&self) -> &str {
            self.id
        }

        async fn call(&self, request: &ProviderRequest, _cancel: &CancellationToken) -> anyhow::Result<Value> {
            assert_eq!(request.operation(), "search");
            match &self.answer {
                Some(v) => Ok(v.clone()),
                None => anyhow::bail!("upstream returned 503"),
            }
        }
    }

    fn setup(providers: Vec<Named>) -> (ResolutionPipeline, ProviderLoader, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let loader = ProviderLoader::new(dir.path());
        for p in providers {
            loader.register(Arc::new(p));
        }
        let pipeline = ResolutionPipeline::new(Arc::new(StreamClassifier::new()), Duration::from_secs(5));
        (pipeline, loader, dir)
    }

    #[tokio::test]
    async fn partial_failure_keeps_successful_results() {
        let (pipeline, loader, _dir) = setup(vec![
            Named {
                id: "p1",
                answer: Some(json!([{"title": "Found", "image": "", "link": "/found"}])),
            },
            Named { id: "p2", answer: None },
        ]);
        let ids = vec!["p1".to_string(), "p2".to_string()];

        let result = federated_search(&pipeline, &loader, &ids, "found", 1, &CancellationToken::new()).await;

        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].provider, "p1");
        assert_eq!(result.results[0].posts[0].link, "/found");
        assert_eq!(result.results[0].posts[0].provider, "p1");

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].provider, "p2");
        assert_eq!(result.failures[0].error, "provider_failed");
        assert!(result.failures[0].details.contains("503"));
    }

    #[tokio::test]
    async fn unknown_provider_is_a_failure_entry() {
        let (pipeline, loader, _dir) = setup(vec![Named {
            id: "p1",
            answer: Some(json!([])),
        }]);
        let ids = vec!["p1".to_string(), "ghost".to_string()];

        let result = federated_search(&pipeline, &loader, &ids, "x", 1, &CancellationToken::new()).await;

        assert_eq!(result.results.len(), 1);
        assert!(result.results[0].posts.is_empty());
        assert_eq!(result.failures[0].error, "provider_not_found");
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(FederatedSearch {
            results: vec![ProviderResults {
                provider: "p1".into(),
                posts: vec![],
                has_next_page: true,
            }],
            failures: vec![],
        })
        .unwrap();
        assert_eq!(value["results"][0]["hasNextPage"], true);
        assert_eq!(value["failures"], json!([]));
    }
}
