//! Bounds and sanitization for untrusted slide payloads.
//!
//! Structural problems reject the whole payload: nothing is rendered. Content
//! problems (oversized text, long lists, links to hosts outside the allow-list)
//! are fixed in place and counted in a [`SanitizeReport`].

mod validator;

pub use validator::PayloadValidator;

use crate::model::SlideDocument;

/// Maximum number of slides in one payload.
pub const DEFAULT_MAX_SLIDES: usize = 100;

/// Maximum number of content blocks on one slide.
pub const DEFAULT_MAX_BLOCKS: usize = 50;

/// Maximum characters kept in any text field.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 100_000;

/// Maximum inline spans kept per text element.
pub const DEFAULT_MAX_SPANS: usize = 500;

/// Maximum bullet items kept per nesting level.
pub const DEFAULT_MAX_BULLET_ITEMS: usize = 100;

/// Appended to text that was cut at the character limit.
pub const TRUNCATION_MARKER: &str = " …[truncated]";

/// Hosts that links and remote images may point to, including subdomains.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "github.com",
    "githubusercontent.com",
    "gitlab.com",
    "wikipedia.org",
    "youtube.com",
    "figma.com",
];

/// Limits applied by [`PayloadValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub max_slides: usize,
    pub max_blocks: usize,
    pub max_text_chars: usize,
    pub max_spans: usize,
    pub max_bullet_items: usize,

    /// Lowercase host names. A URL is allowed if its host equals one of these
    /// or is a subdomain of one.
    pub allowed_hosts: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_slides: DEFAULT_MAX_SLIDES,
            max_blocks: DEFAULT_MAX_BLOCKS,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_spans: DEFAULT_MAX_SPANS,
            max_bullet_items: DEFAULT_MAX_BULLET_ITEMS,
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl ValidatorConfig {
    /// Replace the allow-list, normalizing entries to lowercase.
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        self
    }
}

/// What sanitization changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Text fields cut at the character limit
    pub truncated_texts: usize,

    /// Span lists cut at the span limit
    pub truncated_span_lists: usize,

    /// Bullet levels cut at the item limit
    pub truncated_bullet_lists: usize,

    /// Blocks dropped because they point outside the allow-list
    pub removed_blocks: usize,

    /// Inline links and background images dropped for the same reason
    pub removed_links: usize,
}

impl SanitizeReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// A payload that passed validation, with the sanitized slides.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayload {
    pub slides: Vec<SlideDocument>,
    pub report: SanitizeReport,
}
