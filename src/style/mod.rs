//! Style resolution.
//!
//! Slides carry sparse per-class overrides. The resolver merges them over
//! built-in defaults and picks fonts, falling back to the default host family
//! for a whole class whenever any requested variant is unavailable.
//!
//! # Element Classes
//!
//! | Class          | Used for                         | Default size |
//! |----------------|----------------------------------|--------------|
//! | `heading1..6`  | headings by level                | 64 .. 24     |
//! | `paragraph`    | paragraphs, quotes, tables, cards| 24           |
//! | `bullet`       | bullet items                     | 24           |
//! | `code`         | code blocks                      | 20           |
//! | `caption`      | footnotes and slide numbers      | 14           |

pub mod resolver;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::host::StyleHandle;
use crate::model::ContentBlock;

pub use resolver::{prepare_styles, remap_variant, requested_fonts, resolve};

// =============================================================================
// Defaults
// =============================================================================

/// Family guaranteed to be available on the host.
pub const DEFAULT_FONT_FAMILY: &str = "Inter";

/// Family requested for code blocks when no override is given.
pub const DEFAULT_CODE_FONT_FAMILY: &str = "Roboto Mono";

/// The four canonical variant names.
pub const REGULAR: &str = "Regular";
pub const BOLD: &str = "Bold";
pub const ITALIC: &str = "Italic";
pub const BOLD_ITALIC: &str = "Bold Italic";

// =============================================================================
// Style Classes
// =============================================================================

/// Logical element class a style applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleClass {
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Paragraph,
    Bullet,
    Code,
    Caption,
}

impl StyleClass {
    pub const COUNT: usize = 10;

    pub const ALL: [StyleClass; StyleClass::COUNT] = [
        StyleClass::Heading1,
        StyleClass::Heading2,
        StyleClass::Heading3,
        StyleClass::Heading4,
        StyleClass::Heading5,
        StyleClass::Heading6,
        StyleClass::Paragraph,
        StyleClass::Bullet,
        StyleClass::Code,
        StyleClass::Caption,
    ];

    /// Heading class for a level; out-of-range levels are clamped to 1..=6.
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => StyleClass::Heading1,
            2 => StyleClass::Heading2,
            3 => StyleClass::Heading3,
            4 => StyleClass::Heading4,
            5 => StyleClass::Heading5,
            _ => StyleClass::Heading6,
        }
    }

    /// The class whose style a block is rendered with.
    pub fn for_block(block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Heading { level, .. } => StyleClass::heading(*level),
            ContentBlock::Bullets { .. } => StyleClass::Bullet,
            ContentBlock::Code { .. } => StyleClass::Code,
            _ => StyleClass::Paragraph,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn default_size(self) -> f32 {
        match self {
            StyleClass::Heading1 => 64.0,
            StyleClass::Heading2 => 48.0,
            StyleClass::Heading3 => 40.0,
            StyleClass::Heading4 => 32.0,
            StyleClass::Heading5 => 28.0,
            StyleClass::Heading6 => 24.0,
            StyleClass::Paragraph | StyleClass::Bullet => 24.0,
            StyleClass::Code => 20.0,
            StyleClass::Caption => 14.0,
        }
    }

    fn default_color(self) -> Rgb {
        match self {
            StyleClass::Caption => Rgb::new(0.4, 0.4, 0.4),
            _ => Rgb::new(0.1, 0.1, 0.1),
        }
    }

    fn default_font(self) -> FontRequest {
        match self {
            StyleClass::Code => FontRequest::family(DEFAULT_CODE_FONT_FAMILY),
            _ => FontRequest::family(DEFAULT_FONT_FAMILY),
        }
    }
}

// =============================================================================
// Overrides
// =============================================================================

/// Per-slide style overrides, keyed by element class.
pub type StyleOverrides = BTreeMap<StyleClass, ClassOverride>;

/// Sparse override for one element class. Unset fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Key of a host library style to attach
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_style: Option<String>,
}

/// A requested family with the variant names to use for each of the four slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontRequest {
    pub family: String,
    #[serde(default = "default_regular")]
    pub regular: String,
    #[serde(default = "default_bold")]
    pub bold: String,
    #[serde(default = "default_italic")]
    pub italic: String,
    #[serde(default = "default_bold_italic")]
    pub bold_italic: String,
}

fn default_regular() -> String {
    REGULAR.to_string()
}

fn default_bold() -> String {
    BOLD.to_string()
}

fn default_italic() -> String {
    ITALIC.to_string()
}

fn default_bold_italic() -> String {
    BOLD_ITALIC.to_string()
}

impl FontRequest {
    /// Request a family with the canonical variant names.
    pub fn family(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            regular: default_regular(),
            bold: default_bold(),
            italic: default_italic(),
            bold_italic: default_bold_italic(),
        }
    }

    /// The four (family, variant) pairs this request needs.
    pub fn font_names(&self) -> [FontName; 4] {
        [
            FontName::new(&self.family, &self.regular),
            FontName::new(&self.family, &self.bold),
            FontName::new(&self.family, &self.italic),
            FontName::new(&self.family, &self.bold_italic),
        ]
    }
}

// =============================================================================
// Resolved Styles
// =============================================================================

/// A concrete (family, variant) pair as the host knows it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl std::fmt::Display for FontName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

/// Fonts for the four variants of one class, always from a single family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontDescriptor {
    pub regular: FontName,
    pub bold: FontName,
    pub italic: FontName,
    pub bold_italic: FontName,
}

impl FontDescriptor {
    /// Pick the variant matching an emphasis combination.
    pub fn pick(&self, bold: bool, italic: bool) -> &FontName {
        match (bold, italic) {
            (true, true) => &self.bold_italic,
            (true, false) => &self.bold,
            (false, true) => &self.italic,
            (false, false) => &self.regular,
        }
    }

    pub fn family(&self) -> &str {
        &self.regular.family
    }
}

/// RGB color with channels in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `#RGB`. Returns `None` for anything else.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let digits = value.trim().strip_prefix('#')?;
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };

        let channel = |i: usize| {
            u8::from_str_radix(expanded.get(i..i + 2)?, 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };

        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Fully resolved style for one element class.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub class: StyleClass,
    pub font: FontDescriptor,
    pub size: f32,
    pub color: Rgb,
    pub position: Option<Point>,
    pub library_style: Option<StyleHandle>,
    /// Whether the requested family was replaced by the default family
    pub fell_back: bool,
}

/// Resolved styles for every element class of one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyleSet {
    styles: [ResolvedStyle; StyleClass::COUNT],
}

impl ResolvedStyleSet {
    pub fn get(&self, class: StyleClass) -> &ResolvedStyle {
        &self.styles[class.index()]
    }

    pub fn get_mut(&mut self, class: StyleClass) -> &mut ResolvedStyle {
        &mut self.styles[class.index()]
    }

    pub fn for_block(&self, block: &ContentBlock) -> &ResolvedStyle {
        self.get(StyleClass::for_block(block))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedStyle> {
        self.styles.iter()
    }
}
