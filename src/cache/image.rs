use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use super::notify::Notifier;
use super::resource::ResourceCache;
use crate::error::{ResourceError, ResourceKind};
use crate::hash::{hash_bytes_sampled, ContentHash, IMAGE_SAMPLE_SIZE};
use crate::host::{ImageHandle, ResourceHost};
use crate::model::ImageSource;

/// Cache key for an image.
///
/// Embedded images are content-addressed by a sampled hash of their encoded
/// bytes; remote images are keyed by URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageKey {
    Embedded(ContentHash),
    Remote(String),
}

impl ImageKey {
    pub fn for_source(source: &ImageSource) -> Self {
        match source {
            ImageSource::Embedded { data, .. } => {
                ImageKey::Embedded(hash_bytes_sampled(data, IMAGE_SAMPLE_SIZE))
            }
            ImageSource::Remote { url } => ImageKey::Remote(url.clone()),
        }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKey::Embedded(hash) => write!(f, "embedded:{}", hash),
            ImageKey::Remote(url) => f.write_str(url),
        }
    }
}

/// Image resource cache. Identical images upload once per process lifetime.
pub struct ImageCache {
    cache: ResourceCache<ImageKey, ImageHandle>,
}

impl ImageCache {
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self {
            cache: ResourceCache::new(ResourceKind::Image, notifier),
        }
    }

    /// Resolve an image source to a host handle, uploading it on first use.
    pub async fn resolve<H: ResourceHost + ?Sized>(
        &self,
        host: &H,
        source: &ImageSource,
    ) -> Result<ImageHandle, ResourceError> {
        let key = ImageKey::for_source(source);

        self.cache
            .get_or_resolve(&key, host, || async {
                match source {
                    ImageSource::Embedded { data, .. } => {
                        host.upload_image(Bytes::copy_from_slice(data)).await
                    }
                    ImageSource::Remote { url } => {
                        let data = host.fetch_image(url).await?;
                        host.upload_image(data).await
                    }
                }
            })
            .await
    }

    pub async fn len(&self) -> usize {
        self.cache.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.is_empty().await
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}
