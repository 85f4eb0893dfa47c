//! Node rendering: turning one content block into a visual subtree.
//!
//! The engine only depends on [`NodeRenderer`]. [`BasicRenderer`] is the
//! implementation shipped with the crate; hosts with richer layout replace it.

pub mod basic;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::ResourceCaches;
use crate::error::RenderError;
use crate::host::{ImageHandle, NodeId, ResourceHost, StyleHandle};
use crate::model::ContentBlock;
use crate::style::{FontName, Point, ResolvedStyle, ResolvedStyleSet, Rgb};

pub use basic::{BasicRenderer, LINK_CARD_TEMPLATE};

// =============================================================================
// Visual Nodes
// =============================================================================

/// A host-independent description of a node subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VisualNode {
    Text(TextNode),
    Frame(FrameNode),
    Image(ImageNode),
    Clone(CloneNode),
}

impl VisualNode {
    /// Every font referenced anywhere in this subtree.
    pub fn fonts(&self) -> Vec<&FontName> {
        let mut fonts = Vec::new();
        self.visit(&mut |node| {
            if let VisualNode::Text(text) = node {
                fonts.push(&text.font);
                fonts.extend(text.runs.iter().map(|run| &run.font));
            }
        });
        fonts
    }

    /// Every image handle referenced anywhere in this subtree.
    pub fn images(&self) -> Vec<&ImageHandle> {
        let mut images = Vec::new();
        self.visit(&mut |node| {
            if let VisualNode::Image(image) = node {
                images.push(&image.image);
            }
        });
        images
    }

    /// Every template referenced anywhere in this subtree.
    pub fn templates(&self) -> Vec<&NodeId> {
        let mut templates = Vec::new();
        self.visit(&mut |node| {
            if let VisualNode::Clone(clone) = node {
                templates.push(&clone.template);
            }
        });
        templates
    }

    /// Every library style referenced anywhere in this subtree.
    pub fn library_styles(&self) -> Vec<&StyleHandle> {
        let mut styles = Vec::new();
        self.visit(&mut |node| {
            if let VisualNode::Text(TextNode {
                library_style: Some(style),
                ..
            }) = node
            {
                styles.push(style);
            }
        });
        styles
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a VisualNode)) {
        f(self);
        if let VisualNode::Frame(frame) = self {
            for child in &frame.children {
                child.visit(f);
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VisualNode::Text(n) => &n.name,
            VisualNode::Frame(n) => &n.name,
            VisualNode::Image(n) => &n.name,
            VisualNode::Clone(n) => &n.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub name: String,
    pub characters: String,
    pub font: FontName,
    pub size: f32,
    pub color: Rgb,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<TextRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_style: Option<StyleHandle>,
}

impl TextNode {
    /// Plain text in the regular variant of `style`.
    pub fn plain(name: impl Into<String>, characters: impl Into<String>, style: &ResolvedStyle) -> Self {
        Self {
            name: name.into(),
            characters: characters.into(),
            font: style.font.regular.clone(),
            size: style.size,
            color: style.color,
            position: style.position,
            runs: Vec::new(),
            library_style: style.library_style.clone(),
        }
    }
}

/// Styling for a character range of a text node. Offsets count characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub start: usize,
    pub end: usize,
    pub font: FontName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Layout {
    Vertical,
    Horizontal,
    Grid { columns: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameNode {
    pub name: String,
    pub layout: Layout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default)]
    pub children: Vec<VisualNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageNode {
    pub name: String,
    pub image: ImageHandle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// An instance of a template node with some of its text layers replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneNode {
    pub name: String,
    pub template: NodeId,
    #[serde(default)]
    pub text_overrides: BTreeMap<String, String>,
}

// =============================================================================
// Renderer Contract
// =============================================================================

/// What a renderer may use while building nodes.
pub struct RenderContext<'a> {
    pub caches: &'a ResourceCaches,
    pub host: &'a dyn ResourceHost,
    /// Styles of every class on the current slide
    pub styles: &'a ResolvedStyleSet,
}

/// Turns one resolved content block into a visual subtree.
///
/// `Ok(None)` means "render nothing" and is not an error. An `Err` fails the
/// whole slide.
#[async_trait]
pub trait NodeRenderer: Send + Sync {
    async fn render_block(
        &self,
        block: &ContentBlock,
        style: &ResolvedStyle,
        ctx: &RenderContext<'_>,
    ) -> Result<Option<VisualNode>, RenderError>;
}
