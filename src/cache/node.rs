use std::sync::Arc;

use super::notify::Notifier;
use super::resource::ResourceCache;
use crate::error::{HostError, ResourceKind};
use crate::host::{NodeId, ResourceHost};

/// Cache of template nodes that can be cloned, keyed by template name.
///
/// A template that does not exist is memoized as a negative result, so a deck
/// without the template does not search the document on every render.
pub struct NodeCache {
    cache: ResourceCache<String, NodeId>,
}

impl NodeCache {
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self {
            cache: ResourceCache::new(ResourceKind::Node, notifier),
        }
    }

    pub async fn find_template<H: ResourceHost + ?Sized>(
        &self,
        host: &H,
        name: &str,
    ) -> Option<NodeId> {
        self.cache
            .get_or_resolve(&name.to_string(), host, || async {
                host.find_template(name)
                    .await?
                    .ok_or_else(|| HostError::NodeNotFound(name.to_string()))
            })
            .await
            .ok()
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    pub async fn negative_count(&self) -> usize {
        self.cache.negative_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[tokio::test]
    async fn test_missing_template_searched_once() {
        let host = MemoryHost::new();
        let nodes = NodeCache::new(Arc::new(Notifier::new()));

        assert!(nodes.find_template(&host, "link-card").await.is_none());
        assert!(nodes.find_template(&host, "link-card").await.is_none());

        assert_eq!(host.counters().template_lookups, 1);
        assert_eq!(nodes.negative_count().await, 1);
    }

    #[tokio::test]
    async fn test_existing_template_found() {
        let host = MemoryHost::new();
        let id = host.add_template("link-card");
        let nodes = NodeCache::new(Arc::new(Notifier::new()));

        assert_eq!(nodes.find_template(&host, "link-card").await, Some(id));
    }
}
