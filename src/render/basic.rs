use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    CloneNode, FrameNode, ImageNode, Layout, NodeRenderer, RenderContext, TextNode, TextRun,
    VisualNode,
};
use crate::error::RenderError;
use crate::model::{BulletItem, ContentBlock, ImageSource, InlineSpan};
use crate::style::{Point, ResolvedStyle, StyleClass};

/// Name of the template node cloned for link cards, when the document has one.
pub const LINK_CARD_TEMPLATE: &str = "slide-sync/link-card";

/// Horizontal indent per bullet nesting level.
const BULLET_INDENT: f32 = 32.0;

/// Unordered markers, cycling by depth.
const BULLET_MARKERS: [&str; 3] = ["•", "◦", "▪"];

/// Straightforward renderer producing one subtree per block.
#[derive(Debug, Clone, Default)]
pub struct BasicRenderer;

impl BasicRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NodeRenderer for BasicRenderer {
    async fn render_block(
        &self,
        block: &ContentBlock,
        style: &ResolvedStyle,
        ctx: &RenderContext<'_>,
    ) -> Result<Option<VisualNode>, RenderError> {
        let node = match block {
            ContentBlock::Paragraph { text, spans } => {
                VisualNode::Text(styled_text("paragraph", text, spans, style, ctx, false, false))
            }

            ContentBlock::Heading { level, text, spans } => VisualNode::Text(styled_text(
                &format!("heading-{}", level),
                text,
                spans,
                style,
                ctx,
                true,
                false,
            )),

            ContentBlock::Bullets {
                ordered,
                start,
                items,
            } => {
                let mut rows = Vec::new();
                bullet_rows(items, *ordered, *start, 0, style, ctx, &mut rows);
                VisualNode::Frame(FrameNode {
                    name: "bullets".to_string(),
                    layout: Layout::Vertical,
                    position: style.position,
                    children: rows,
                })
            }

            ContentBlock::Code { language, text } => {
                let name = match language {
                    Some(language) => format!("code:{}", language),
                    None => "code".to_string(),
                };
                VisualNode::Frame(FrameNode {
                    name,
                    layout: Layout::Vertical,
                    position: style.position,
                    children: vec![VisualNode::Text(TextNode {
                        position: None,
                        ..TextNode::plain("code-text", text.as_str(), style)
                    })],
                })
            }

            ContentBlock::Image { source, alt } => image_node(source, alt.as_deref(), style, ctx).await,

            ContentBlock::Blockquote { text, spans } => VisualNode::Frame(FrameNode {
                name: "blockquote".to_string(),
                layout: Layout::Vertical,
                position: style.position,
                children: vec![VisualNode::Text(TextNode {
                    position: None,
                    ..styled_text("quote-text", text, spans, style, ctx, false, true)
                })],
            }),

            ContentBlock::Table { headers, rows } => {
                let columns = rows
                    .iter()
                    .map(Vec::len)
                    .chain(std::iter::once(headers.len()))
                    .max()
                    .unwrap_or(0);
                if columns == 0 {
                    debug!("Skipping empty table");
                    return Ok(None);
                }
                VisualNode::Frame(table_frame(headers, rows, columns, style))
            }

            ContentBlock::LinkCard {
                url,
                title,
                description,
            } => link_card(url, title.as_deref(), description.as_deref(), style, ctx).await,

            ContentBlock::Unknown => {
                warn!("Unrecognized block kind, rendering nothing");
                return Ok(None);
            }
        };

        Ok(Some(node))
    }
}

/// Text node whose runs follow the inline spans.
///
/// Without spans the whole text uses the base emphasis. Code spans use the
/// regular variant of the code class.
fn styled_text(
    name: &str,
    text: &str,
    spans: &[InlineSpan],
    style: &ResolvedStyle,
    ctx: &RenderContext<'_>,
    bold: bool,
    italic: bool,
) -> TextNode {
    let mut node = TextNode {
        font: style.font.pick(bold, italic).clone(),
        ..TextNode::plain(name, text, style)
    };

    if spans.is_empty() {
        return node;
    }

    let (characters, runs) = span_runs(spans, 0, style, ctx, bold, italic);
    node.characters = characters;
    node.runs = runs;
    node
}

fn span_runs(
    spans: &[InlineSpan],
    offset: usize,
    style: &ResolvedStyle,
    ctx: &RenderContext<'_>,
    bold: bool,
    italic: bool,
) -> (String, Vec<TextRun>) {
    let mut characters = String::new();
    let mut runs = Vec::with_capacity(spans.len());
    let mut cursor = offset;

    for span in spans {
        let len = span.text.chars().count();
        let font = if span.code {
            ctx.styles.get(StyleClass::Code).font.regular.clone()
        } else {
            style.font.pick(bold || span.bold, italic || span.italic).clone()
        };

        characters.push_str(&span.text);
        runs.push(TextRun {
            start: cursor,
            end: cursor + len,
            font,
            link: span.link.clone(),
        });
        cursor += len;
    }

    (characters, runs)
}

fn bullet_rows(
    items: &[BulletItem],
    ordered: bool,
    start: Option<u32>,
    depth: usize,
    style: &ResolvedStyle,
    ctx: &RenderContext<'_>,
    rows: &mut Vec<VisualNode>,
) {
    let first = start.unwrap_or(1);

    for (i, item) in items.iter().enumerate() {
        let marker = if ordered {
            format!("{}.", first as usize + i)
        } else {
            BULLET_MARKERS[depth % BULLET_MARKERS.len()].to_string()
        };
        let prefix = format!("{} ", marker);
        let prefix_len = prefix.chars().count();

        let mut node = TextNode {
            position: Some(Point {
                x: style.position.map(|p| p.x).unwrap_or(0.0) + depth as f32 * BULLET_INDENT,
                y: style.position.map(|p| p.y).unwrap_or(0.0),
            }),
            ..TextNode::plain(format!("bullet-{}", depth), format!("{}{}", prefix, item.text), style)
        };

        if !item.spans.is_empty() {
            let (characters, runs) = span_runs(&item.spans, prefix_len, style, ctx, false, false);
            node.characters = format!("{}{}", prefix, characters);
            node.runs = runs;
        }

        rows.push(VisualNode::Text(node));

        if !item.children.is_empty() {
            bullet_rows(
                &item.children,
                item.ordered,
                item.start,
                depth + 1,
                style,
                ctx,
                rows,
            );
        }
    }
}

async fn image_node(
    source: &ImageSource,
    alt: Option<&str>,
    style: &ResolvedStyle,
    ctx: &RenderContext<'_>,
) -> VisualNode {
    match ctx.caches.images.resolve(ctx.host, source).await {
        Ok(image) => VisualNode::Image(ImageNode {
            name: "image".to_string(),
            image,
            alt: alt.map(str::to_string),
        }),
        Err(e) => {
            debug!("Rendering image placeholder: {}", e);
            VisualNode::Frame(FrameNode {
                name: "image-placeholder".to_string(),
                layout: Layout::Vertical,
                position: style.position,
                children: vec![VisualNode::Text(TextNode::plain(
                    "image-placeholder-text",
                    alt.unwrap_or("Image unavailable"),
                    style,
                ))],
            })
        }
    }
}

fn table_frame(
    headers: &[String],
    rows: &[Vec<String>],
    columns: usize,
    style: &ResolvedStyle,
) -> FrameNode {
    let mut cells = Vec::with_capacity(columns * (rows.len() + 1));

    if !headers.is_empty() {
        for column in 0..columns {
            let text = headers.get(column).map(String::as_str).unwrap_or("");
            cells.push(VisualNode::Text(TextNode {
                font: style.font.bold.clone(),
                position: None,
                ..TextNode::plain("table-header", text, style)
            }));
        }
    }

    for row in rows {
        for column in 0..columns {
            let text = row.get(column).map(String::as_str).unwrap_or("");
            cells.push(VisualNode::Text(TextNode {
                position: None,
                ..TextNode::plain("table-cell", text, style)
            }));
        }
    }

    FrameNode {
        name: "table".to_string(),
        layout: Layout::Grid { columns },
        position: style.position,
        children: cells,
    }
}

async fn link_card(
    url: &str,
    title: Option<&str>,
    description: Option<&str>,
    style: &ResolvedStyle,
    ctx: &RenderContext<'_>,
) -> VisualNode {
    let title = title.unwrap_or(url);

    if let Some(template) = ctx.caches.nodes.find_template(ctx.host, LINK_CARD_TEMPLATE).await {
        let mut text_overrides = BTreeMap::new();
        text_overrides.insert("title".to_string(), title.to_string());
        text_overrides.insert("url".to_string(), url.to_string());
        if let Some(description) = description {
            text_overrides.insert("description".to_string(), description.to_string());
        }
        return VisualNode::Clone(CloneNode {
            name: "link-card".to_string(),
            template,
            text_overrides,
        });
    }

    let mut children = vec![
        VisualNode::Text(TextNode {
            font: style.font.bold.clone(),
            position: None,
            ..TextNode::plain("link-card-title", title, style)
        }),
        VisualNode::Text(TextNode {
            position: None,
            runs: vec![TextRun {
                start: 0,
                end: url.chars().count(),
                font: style.font.regular.clone(),
                link: Some(url.to_string()),
            }],
            ..TextNode::plain("link-card-url", url, style)
        }),
    ];
    if let Some(description) = description {
        children.push(VisualNode::Text(TextNode {
            position: None,
            ..TextNode::plain("link-card-description", description, style)
        }));
    }

    VisualNode::Frame(FrameNode {
        name: "link-card".to_string(),
        layout: Layout::Vertical,
        position: style.position,
        children,
    })
}
