//! Slide documents: the desired state a reconciliation run converges toward.
//!
//! A [`SlideDocument`] has no intrinsic identity. Its position in the desired
//! list is its identity, and the engine tags host nodes with that position.

use serde::{Deserialize, Serialize};

use crate::style::StyleOverrides;

// =============================================================================
// Slide Document
// =============================================================================

/// One slide's desired content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDocument {
    /// Ordered content blocks
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,

    /// Solid color and/or image behind the slide content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<BackgroundSpec>,

    /// Sparse per-class style overrides
    #[serde(default)]
    pub style: StyleOverrides,

    /// Slide number rendered in the corner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_number: Option<SlideNumberSpec>,

    /// Transition into this slide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionSpec>,

    /// Text prepended to the first heading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<TitlePrefixSpec>,

    /// Footnotes rendered at the bottom of the slide
    #[serde(default)]
    pub footnotes: Vec<Footnote>,
}

// =============================================================================
// Content Blocks
// =============================================================================

/// One resolved content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ContentBlock {
    Paragraph {
        #[serde(default)]
        text: String,
        #[serde(default)]
        spans: Vec<InlineSpan>,
    },
    Heading {
        level: u8,
        #[serde(default)]
        text: String,
        #[serde(default)]
        spans: Vec<InlineSpan>,
    },
    Bullets {
        #[serde(default)]
        ordered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u32>,
        #[serde(default)]
        items: Vec<BulletItem>,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default)]
        text: String,
    },
    Image {
        source: ImageSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    Blockquote {
        #[serde(default)]
        text: String,
        #[serde(default)]
        spans: Vec<InlineSpan>,
    },
    Table {
        #[serde(default)]
        headers: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<String>>,
    },
    LinkCard {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Any block kind this version does not know how to render
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    /// Short name of the block kind, used in logs and errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ContentBlock::Paragraph { .. } => "paragraph",
            ContentBlock::Heading { .. } => "heading",
            ContentBlock::Bullets { .. } => "bullets",
            ContentBlock::Code { .. } => "code",
            ContentBlock::Image { .. } => "image",
            ContentBlock::Blockquote { .. } => "blockquote",
            ContentBlock::Table { .. } => "table",
            ContentBlock::LinkCard { .. } => "link-card",
            ContentBlock::Unknown => "unknown",
        }
    }
}

/// A styled run of text inside a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineSpan {
    pub text: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// One bullet with its nested children.
///
/// `ordered` and `start` describe how this item's children are numbered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletItem {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<InlineSpan>,
    #[serde(default)]
    pub children: Vec<BulletItem>,
    #[serde(default)]
    pub ordered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
}

/// Where image bytes come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ImageSource {
    Embedded {
        data: Vec<u8>,
        #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Remote {
        url: String,
    },
}

// =============================================================================
// Slide-level Specs
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSource>,
}

/// Slide number text. `{n}` is the 1-based position, `{total}` the deck length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideNumberSpec {
    #[serde(default = "default_slide_number_format")]
    pub format: String,
}

fn default_slide_number_format() -> String {
    "{n}".to_string()
}

impl Default for SlideNumberSpec {
    fn default() -> Self {
        Self {
            format: default_slide_number_format(),
        }
    }
}

impl SlideNumberSpec {
    /// Render the number text for the slide at `index` in a deck of `total`.
    pub fn render(&self, index: usize, total: usize) -> String {
        self.format
            .replace("{n}", &(index + 1).to_string())
            .replace("{total}", &total.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSpec {
    pub style: String,
    #[serde(default)]
    pub duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitlePrefixSpec {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Footnote {
    #[serde(default)]
    pub label: String,
    pub text: String,
}
