//! Fan-out of one document to several platforms

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::{
    model::{Document, PlatformConfig, PublishResult},
    ports::{AdaptorFactory, ImageRehoster, MappingStore, MarkdownRenderer, SlugGenerator},
    usecases::publish::PublishOrchestrator,
};

/// One destination of a fan-out publish
#[derive(Debug, Clone)]
pub struct PublishTarget {
    pub platform_key: String,
    pub config: PlatformConfig,
}

impl<F, M, I, R, S> PublishOrchestrator<F, M, I, R, S>
where
    F: AdaptorFactory + ?Sized,
    M: MappingStore + ?Sized,
    I: ImageRehoster + ?Sized,
    R: MarkdownRenderer + ?Sized,
    S: SlugGenerator + ?Sized,
{
    /// Publish `document` to every target with bounded concurrency
    ///
    /// Each platform works on its own copy of the document; a failure on one
    /// never affects another. Results come back in target order.
    pub async fn publish_to_all(
        &self,
        targets: &[PublishTarget],
        document_id: &str,
        document: &Document,
        max_concurrent: usize,
    ) -> Vec<PublishResult> {
        let max_concurrent = max_concurrent.max(1);
        let mut tasks: FuturesUnordered<BoxFuture<'_, (usize, PublishResult)>> =
            FuturesUnordered::new();
        let mut targets_iter = targets.iter().enumerate();
        let mut results = Vec::with_capacity(targets.len());

        tracing::info!(
            document_id = %document_id,
            targets = targets.len(),
            max_concurrent,
            "Publishing to all targets"
        );

        loop {
            while tasks.len() < max_concurrent {
                let Some((index, target)) = targets_iter.next() else {
                    break;
                };
                tasks.push(Box::pin(async move {
                    let result = self
                        .publish(&target.platform_key, document_id, &target.config, document)
                        .await;
                    (index, result)
                }));
            }

            match tasks.next().await {
                Some(result) => results.push(result),
                None => break,
            }
        }

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CUSTOM_SLUG_KEY;
    use crate::ports::RemoteIdPolicy;
    use crate::usecases::publish::tests::{FakeAdaptor, FakeStore, config, document, orchestrator};
    use std::sync::Arc;

    fn target(key: &str, posid_key: &str) -> PublishTarget {
        PublishTarget {
            platform_key: key.to_string(),
            config: PlatformConfig {
                posid_key: posid_key.to_string(),
                ..config()
            },
        }
    }

    #[tokio::test]
    async fn test_fan_out_isolates_failures() {
        let adaptor = Arc::new(FakeAdaptor::ok());
        let store = Arc::new(FakeStore::default());
        let orchestrator = orchestrator(adaptor, RemoteIdPolicy::Mapped, store.clone());
        let targets = vec![
            target("cnblogs", "cnblogs-post-id"),
            target("broken", ""),
            target("wordpress", "wordpress-post-id"),
        ];
        let source = document();

        let results = orchestrator
            .publish_to_all(&targets, "doc-1", &source, 2)
            .await;

        let keys: Vec<_> = results.iter().map(|r| r.platform_key.as_str()).collect();
        assert_eq!(keys, vec!["cnblogs", "broken", "wordpress"]);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);

        let meta = store.meta("doc-1");
        assert!(meta.contains_key("cnblogs-post-id"));
        assert!(meta.contains_key("wordpress-post-id"));
        assert!(meta.contains_key(CUSTOM_SLUG_KEY));
        assert!(source.slug.is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_with_no_targets() {
        let orchestrator = orchestrator(
            Arc::new(FakeAdaptor::ok()),
            RemoteIdPolicy::Mapped,
            Arc::new(FakeStore::default()),
        );

        let results = orchestrator
            .publish_to_all(&[], "doc-1", &document(), 4)
            .await;

        assert!(results.is_empty());
    }
}
