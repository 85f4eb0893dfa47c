use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::{SanitizeReport, ValidatedPayload, ValidatorConfig, TRUNCATION_MARKER};
use crate::error::ValidationError;
use crate::model::{BulletItem, ContentBlock, ImageSource, InlineSpan, SlideDocument};

/// Validates and sanitizes `generate-slides` payloads.
#[derive(Debug, Clone, Default)]
pub struct PayloadValidator {
    config: ValidatorConfig,
}

impl PayloadValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Check the shape of `raw`, then sanitize every slide.
    ///
    /// Returns an error without touching anything if the payload is not a
    /// non-empty list within the slide and block limits, or if any slide is
    /// not a slide document.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedPayload, ValidationError> {
        let slides = raw.as_array().ok_or(ValidationError::NotAList)?;

        if slides.is_empty() {
            return Err(ValidationError::Empty);
        }
        if slides.len() > self.config.max_slides {
            return Err(ValidationError::TooManySlides {
                count: slides.len(),
                max: self.config.max_slides,
            });
        }

        // Block counts are checked on the raw value so an oversized slide is
        // rejected before any of it is deserialized.
        for (index, slide) in slides.iter().enumerate() {
            if let Some(blocks) = slide.get("blocks").and_then(Value::as_array) {
                if blocks.len() > self.config.max_blocks {
                    return Err(ValidationError::TooManyBlocks {
                        index,
                        count: blocks.len(),
                        max: self.config.max_blocks,
                    });
                }
            }
        }

        let mut documents = Vec::with_capacity(slides.len());
        for (index, slide) in slides.iter().enumerate() {
            if !slide.is_object() {
                return Err(ValidationError::Malformed {
                    index,
                    reason: "expected an object".to_string(),
                });
            }
            let doc = SlideDocument::deserialize(slide).map_err(|e| ValidationError::Malformed {
                index,
                reason: e.to_string(),
            })?;
            documents.push(doc);
        }

        let mut sanitizer = Sanitizer {
            validator: self,
            report: SanitizeReport::default(),
        };
        for doc in &mut documents {
            sanitizer.document(doc);
        }
        let report = sanitizer.report;

        if report.is_clean() {
            debug!(slides = documents.len(), "Payload accepted");
        } else {
            info!(
                slides = documents.len(),
                truncated_texts = report.truncated_texts,
                truncated_span_lists = report.truncated_span_lists,
                truncated_bullet_lists = report.truncated_bullet_lists,
                removed_blocks = report.removed_blocks,
                removed_links = report.removed_links,
                "Payload accepted after sanitization"
            );
        }

        Ok(ValidatedPayload {
            slides: documents,
            report,
        })
    }

    /// Whether `raw` is an http(s) URL on an allow-listed host or subdomain.
    pub fn allows_url(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();

        self.config.allowed_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

struct Sanitizer<'a> {
    validator: &'a PayloadValidator,
    report: SanitizeReport,
}

impl Sanitizer<'_> {
    fn document(&mut self, doc: &mut SlideDocument) {
        doc.blocks.retain_mut(|block| self.block(block));

        if let Some(ref mut background) = doc.background {
            let disallowed = match background.image {
                Some(ImageSource::Remote { ref url }) => !self.validator.allows_url(url),
                _ => false,
            };
            if disallowed {
                debug!("Dropping background image outside allow-list");
                background.image = None;
                self.report.removed_links += 1;
            }
        }

        if let Some(ref mut prefix) = doc.title_prefix {
            self.text(&mut prefix.text);
        }
        for footnote in &mut doc.footnotes {
            self.text(&mut footnote.label);
            self.text(&mut footnote.text);
        }
    }

    /// Sanitize one block in place. Returns `false` if it must be removed.
    fn block(&mut self, block: &mut ContentBlock) -> bool {
        match block {
            ContentBlock::Paragraph { text, spans } | ContentBlock::Blockquote { text, spans } => {
                self.text(text);
                self.spans(spans);
            }
            ContentBlock::Heading { level, text, spans } => {
                *level = (*level).clamp(1, 6);
                self.text(text);
                self.spans(spans);
            }
            ContentBlock::Bullets { items, .. } => self.bullets(items),
            ContentBlock::Code { text, .. } => self.text(text),
            ContentBlock::Image { source, alt } => {
                if let ImageSource::Remote { url } = source {
                    if !self.validator.allows_url(url) {
                        debug!(url = %url, "Removing image block outside allow-list");
                        self.report.removed_blocks += 1;
                        return false;
                    }
                }
                if let Some(alt) = alt {
                    self.text(alt);
                }
            }
            ContentBlock::Table { headers, rows } => {
                for cell in headers.iter_mut().chain(rows.iter_mut().flatten()) {
                    self.text(cell);
                }
            }
            ContentBlock::LinkCard {
                url,
                title,
                description,
            } => {
                if !self.validator.allows_url(url) {
                    debug!(url = %url, "Removing link card outside allow-list");
                    self.report.removed_blocks += 1;
                    return false;
                }
                for text in [title, description].into_iter().flatten() {
                    self.text(text);
                }
            }
            ContentBlock::Unknown => {}
        }
        true
    }

    fn bullets(&mut self, items: &mut Vec<BulletItem>) {
        if items.len() > self.validator.config.max_bullet_items {
            items.truncate(self.validator.config.max_bullet_items);
            self.report.truncated_bullet_lists += 1;
        }
        for item in items {
            self.text(&mut item.text);
            self.spans(&mut item.spans);
            self.bullets(&mut item.children);
        }
    }

    fn spans(&mut self, spans: &mut Vec<InlineSpan>) {
        if spans.len() > self.validator.config.max_spans {
            spans.truncate(self.validator.config.max_spans);
            self.report.truncated_span_lists += 1;
        }
        for span in spans {
            self.text(&mut span.text);
            let disallowed = span
                .link
                .as_deref()
                .is_some_and(|link| !self.validator.allows_url(link));
            if disallowed {
                debug!(url = ?span.link, "Dropping inline link outside allow-list");
                span.link = None;
                self.report.removed_links += 1;
            }
        }
    }

    fn text(&mut self, text: &mut String) {
        if let Some((cut, _)) = text.char_indices().nth(self.validator.config.max_text_chars) {
            text.truncate(cut);
            text.push_str(TRUNCATION_MARKER);
            self.report.truncated_texts += 1;
        }
    }
}
