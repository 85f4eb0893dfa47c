use std::sync::Arc;

use super::notify::Notifier;
use super::resource::ResourceCache;
use crate::error::ResourceKind;
use crate::host::{ResourceHost, StyleHandle};

/// Library style import cache, keyed by style key.
pub struct StyleCache {
    cache: ResourceCache<String, StyleHandle>,
}

impl StyleCache {
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self {
            cache: ResourceCache::new(ResourceKind::Style, notifier),
        }
    }

    /// Import a library style. A failed import yields `None` and is not retried.
    pub async fn import<H: ResourceHost + ?Sized>(
        &self,
        host: &H,
        key: &str,
    ) -> Option<StyleHandle> {
        self.cache
            .get_or_resolve(&key.to_string(), host, || host.import_style(key))
            .await
            .ok()
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    pub async fn len(&self) -> usize {
        self.cache.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.is_empty().await
    }
}
