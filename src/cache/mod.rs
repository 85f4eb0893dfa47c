//! Resource caches shared by every reconciliation run.
//!
//! ```text
//! ┌──────────────────────────── ResourceCaches ────────────────────────────┐
//! │  FontCache      (FontName -> ())         + available font set          │
//! │  StyleCache     (style key -> StyleHandle)                             │
//! │  ImageCache     (sampled hash | url -> ImageHandle)                    │
//! │  NodeCache      (template name -> NodeId)                              │
//! │                                                                        │
//! │  all built on ResourceCache<K, V>: singleflight + negative memo        │
//! │  all report through one Notifier: one message per failing key         │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The caches live for the process lifetime. They are only cleared when the
//! host reports a stale handle, and then the whole dependent cache is dropped.

pub mod font;
pub mod image;
pub mod node;
pub mod notify;
pub mod resource;
pub mod style;

use std::sync::Arc;

use tracing::info;

use crate::error::ResourceKind;

pub use self::font::FontCache;
pub use self::image::{ImageCache, ImageKey};
pub use self::node::NodeCache;
pub use self::notify::Notifier;
pub use self::resource::ResourceCache;
pub use self::style::StyleCache;

/// All resource caches, sharing one notifier.
pub struct ResourceCaches {
    pub fonts: FontCache,
    pub styles: StyleCache,
    pub images: ImageCache,
    pub nodes: NodeCache,
    notifier: Arc<Notifier>,
}

impl ResourceCaches {
    pub fn new() -> Self {
        let notifier = Arc::new(Notifier::new());
        Self {
            fonts: FontCache::new(notifier.clone()),
            styles: StyleCache::new(notifier.clone()),
            images: ImageCache::new(notifier.clone()),
            nodes: NodeCache::new(notifier.clone()),
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Drop the whole cache a stale handle came from.
    pub async fn invalidate(&self, kind: ResourceKind) {
        info!(kind = %kind, "Stale reference detected, invalidating cache");
        match kind {
            ResourceKind::Font => self.fonts.clear().await,
            ResourceKind::Style => self.styles.clear().await,
            ResourceKind::Image => self.images.clear().await,
            ResourceKind::Node => self.nodes.clear().await,
        }
    }
}

impl Default for ResourceCaches {
    fn default() -> Self {
        Self::new()
    }
}
