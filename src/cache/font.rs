use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::notify::Notifier;
use super::resource::ResourceCache;
use crate::error::ResourceKind;
use crate::host::ResourceHost;
use crate::style::FontName;

/// Font availability cache.
///
/// Besides memoizing load outcomes it records which (family, variant) pairs
/// loaded successfully; the style resolver decides fallbacks from that set.
pub struct FontCache {
    cache: ResourceCache<FontName, ()>,
    available: RwLock<HashSet<FontName>>,
}

impl FontCache {
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self {
            cache: ResourceCache::new(ResourceKind::Font, notifier),
            available: RwLock::new(HashSet::new()),
        }
    }

    /// Load one font. Returns whether it is available.
    pub async fn load<H: ResourceHost + ?Sized>(&self, host: &H, font: &FontName) -> bool {
        match self
            .cache
            .get_or_resolve(font, host, || host.load_font(font))
            .await
        {
            Ok(()) => {
                self.available.write().await.insert(font.clone());
                true
            }
            Err(_) => false,
        }
    }

    /// Load every font in `fonts`, in order.
    pub async fn load_all<'a, H, I>(&self, host: &H, fonts: I)
    where
        H: ResourceHost + ?Sized,
        I: IntoIterator<Item = &'a FontName>,
    {
        for font in fonts {
            self.load(host, font).await;
        }
    }

    /// Snapshot of the fonts that loaded successfully.
    pub async fn available(&self) -> HashSet<FontName> {
        self.available.read().await.clone()
    }

    pub async fn is_available(&self, font: &FontName) -> bool {
        self.available.read().await.contains(font)
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
        self.available.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[tokio::test]
    async fn test_records_successful_loads_only() {
        let host = MemoryHost::new();
        let fonts = FontCache::new(Arc::new(Notifier::new()));

        let inter = FontName::new("Inter", "Regular");
        let lora = FontName::new("Lora", "Bold");

        assert!(fonts.load(&host, &inter).await);
        assert!(!fonts.load(&host, &lora).await);

        let available = fonts.available().await;
        assert!(available.contains(&inter));
        assert!(!available.contains(&lora));
    }

    #[tokio::test]
    async fn test_failed_font_not_retried() {
        let host = MemoryHost::new();
        let fonts = FontCache::new(Arc::new(Notifier::new()));
        let lora = FontName::new("Lora", "Bold");

        fonts.load(&host, &lora).await;
        fonts.load(&host, &lora).await;
        fonts.load(&host, &lora).await;

        assert_eq!(host.counters().font_loads, 1);
        assert_eq!(host.notifications().len(), 1);
    }
}
