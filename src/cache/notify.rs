use std::collections::HashSet;
use std::sync::Mutex;

use tracing::info;

use crate::host::ResourceHost;

/// Deduplicates user-facing notifications: one per distinct key for the
/// process lifetime.
#[derive(Debug, Default)]
pub struct Notifier {
    seen: Mutex<HashSet<String>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `message` through the host unless `key` was already notified.
    ///
    /// Returns `true` if the message was delivered.
    pub fn notify_once<H: ResourceHost + ?Sized>(&self, host: &H, key: &str, message: &str) -> bool {
        let first = match self.seen.lock() {
            Ok(mut seen) => seen.insert(key.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(key.to_string()),
        };

        if first {
            info!(key = key, "Notifying user: {}", message);
            host.notify(message);
        }
        first
    }
}
