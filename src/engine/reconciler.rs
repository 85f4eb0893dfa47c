use std::borrow::Cow;
use std::collections::{btree_map, BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::ResourceCaches;
use crate::error::{ReconcileError, RenderError};
use crate::hash::{hash_slide, ContentHash};
use crate::host::{Host, NodeId, SlideFrame};
use crate::model::{ContentBlock, Footnote, InlineSpan, SlideDocument, TitlePrefixSpec};
use crate::render::{FrameNode, Layout, NodeRenderer, RenderContext, TextNode, VisualNode};
use crate::style::{prepare_styles, Rgb, StyleClass};

/// What the engine remembers about a slide it rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedSlideRecord {
    pub content_hash: ContentHash,
    pub node_id: NodeId,
}

/// Outcome of a run that finished without failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Slides in the desired list
    pub count: usize,

    /// Slides whose node was (re)built
    pub rendered: usize,

    /// Slides left untouched because their content hash matched
    pub skipped: usize,

    /// Nodes destroyed during pruning
    pub destroyed: usize,
}

/// Converges the host's slide nodes to a desired list of slide documents.
///
/// Owns everything a run needs: the host, the renderer, the resource caches
/// and the record map. Records and caches live as long as the reconciler; a
/// new reconciler over an existing document reattaches to its slides through
/// their tags and re-renders each of them once.
///
/// # Type Parameters
///
/// * `H` - The host platform
/// * `R` - The node renderer
pub struct Reconciler<H, R> {
    host: Arc<H>,
    renderer: R,
    caches: ResourceCaches,

    /// Held for the whole of a run, so runs never interleave
    records: Mutex<HashMap<usize, RenderedSlideRecord>>,

    /// Copy of `records` as of the end of the last run
    published: RwLock<BTreeMap<usize, RenderedSlideRecord>>,
}

impl<H: Host, R: NodeRenderer> Reconciler<H, R> {
    pub fn new(host: Arc<H>, renderer: R) -> Self {
        Self {
            host,
            renderer,
            caches: ResourceCaches::new(),
            records: Mutex::new(HashMap::new()),
            published: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn caches(&self) -> &ResourceCaches {
        &self.caches
    }

    /// The record map as of the end of the last run, ordered by index.
    ///
    /// Does not wait for a run in progress.
    pub async fn records(&self) -> BTreeMap<usize, RenderedSlideRecord> {
        self.published.read().await.clone()
    }

    /// Run one reconciliation pass over `slides`.
    ///
    /// 1. Discover tagged nodes. Tags that parse as an index are candidates for
    ///    reuse; the first node per index wins and the rest are pruned.
    /// 2. For each slide in order, skip it if its content hash and node match
    ///    the record, otherwise render it into a reused or new node.
    /// 3. Destroy every node that was not consumed and drop records past the
    ///    end of the list.
    ///
    /// A failing slide does not stop the run. The remaining slides and the
    /// pruning still happen, and the first failure is returned. Records
    /// committed earlier in the run are kept.
    pub async fn run(&self, slides: &[SlideDocument]) -> Result<RunReport, ReconcileError> {
        let mut records = self.records.lock().await;
        let started = Instant::now();

        let tagged = self
            .host
            .list_tagged()
            .await
            .map_err(ReconcileError::Discovery)?;

        let mut unconsumed: BTreeMap<usize, NodeId> = BTreeMap::new();
        let mut duplicates: Vec<NodeId> = Vec::new();
        for node in tagged {
            let Ok(index) = node.tag.parse::<usize>() else {
                debug!(tag = %node.tag, node = %node.id, "Ignoring foreign tag");
                continue;
            };
            match unconsumed.entry(index) {
                btree_map::Entry::Vacant(entry) => {
                    entry.insert(node.id);
                }
                btree_map::Entry::Occupied(_) => {
                    warn!(index, node = %node.id, "Duplicate slide tag, node will be pruned");
                    duplicates.push(node.id);
                }
            }
        }

        let total = slides.len();
        let mut report = RunReport {
            count: total,
            ..Default::default()
        };
        let mut first_error: Option<ReconcileError> = None;

        for (index, doc) in slides.iter().enumerate() {
            let hash = hash_slide(doc, index, total);
            let existing = unconsumed.remove(&index);

            let unchanged = match (records.get(&index), existing.as_ref()) {
                (Some(record), Some(node)) => record.content_hash == hash && record.node_id == *node,
                _ => false,
            };
            if unchanged {
                debug!(index, hash = %hash, "Slide unchanged, skipping");
                report.skipped += 1;
                continue;
            }

            // A failed render must not leave a record that would skip the
            // half-built node next time.
            records.remove(&index);

            match self.render_slide(index, total, doc, existing).await {
                Ok(node_id) => {
                    debug!(index, node = %node_id, hash = %hash, "Slide rendered");
                    records.insert(
                        index,
                        RenderedSlideRecord {
                            content_hash: hash,
                            node_id,
                        },
                    );
                    report.rendered += 1;
                }
                Err(e) => {
                    if let RenderError::Host(ref host_error) = e {
                        if let Some(kind) = host_error.stale_kind() {
                            self.caches.invalidate(kind).await;
                        }
                    }
                    warn!(index, "Slide failed to render: {}", e);
                    first_error.get_or_insert(ReconcileError::Slide { index, source: e });
                }
            }
        }

        let stale = unconsumed.into_values().chain(duplicates);
        for node_id in stale {
            match self.host.destroy(&node_id).await {
                Ok(()) => {
                    debug!(node = %node_id, "Pruned slide node");
                    report.destroyed += 1;
                }
                Err(e) => {
                    warn!(node = %node_id, "Failed to prune slide node: {}", e);
                    first_error.get_or_insert(ReconcileError::Prune {
                        node_id: node_id.to_string(),
                        source: e,
                    });
                }
            }
        }
        records.retain(|index, _| *index < total);
        *self.published.write().await = records
            .iter()
            .map(|(index, record)| (*index, record.clone()))
            .collect();

        info!(
            count = report.count,
            rendered = report.rendered,
            skipped = report.skipped,
            destroyed = report.destroyed,
            failed = first_error.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reconciliation run finished"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Build one slide into `existing` (cleared first) or a new tagged node.
    async fn render_slide(
        &self,
        index: usize,
        total: usize,
        doc: &SlideDocument,
        existing: Option<NodeId>,
    ) -> Result<NodeId, RenderError> {
        let node_id = match existing {
            Some(id) => {
                self.host.clear_slide(&id).await?;
                id
            }
            None => {
                let id = self.host.create_slide().await?;
                // Tag immediately so a later failure still leaves a node the
                // next run can reuse.
                self.host.set_tag(&id, &index.to_string()).await?;
                id
            }
        };

        let styles = prepare_styles(&doc.style, &self.caches, self.host.as_ref()).await;
        let frame = self.slide_frame(doc).await;
        self.host.configure_slide(&node_id, &frame).await?;

        let ctx = RenderContext {
            caches: &self.caches,
            host: self.host.as_ref(),
            styles: &styles,
        };

        let mut title_prefix = doc.title_prefix.as_ref();
        for block in &doc.blocks {
            let block = match (title_prefix, block) {
                (Some(prefix), ContentBlock::Heading { .. }) => {
                    title_prefix = None;
                    Cow::Owned(prefixed_heading(block, prefix))
                }
                _ => Cow::Borrowed(block),
            };

            let style = styles.for_block(&block);
            match self.renderer.render_block(&block, style, &ctx).await? {
                Some(node) => self.host.append(&node_id, node).await?,
                None => debug!(index, kind = block.kind_name(), "Block rendered nothing"),
            }
        }

        let caption = styles.get(StyleClass::Caption);
        if !doc.footnotes.is_empty() {
            let children = doc
                .footnotes
                .iter()
                .map(|footnote| {
                    VisualNode::Text(TextNode {
                        position: None,
                        ..TextNode::plain("footnote", footnote_text(footnote), caption)
                    })
                })
                .collect();
            let footnotes = VisualNode::Frame(FrameNode {
                name: "footnotes".to_string(),
                layout: Layout::Vertical,
                position: caption.position,
                children,
            });
            self.host.append(&node_id, footnotes).await?;
        }

        if let Some(ref number) = doc.slide_number {
            let text = TextNode::plain("slide-number", number.render(index, total), caption);
            self.host.append(&node_id, VisualNode::Text(text)).await?;
        }

        Ok(node_id)
    }

    async fn slide_frame(&self, doc: &SlideDocument) -> SlideFrame {
        let mut frame = SlideFrame {
            transition: doc.transition.clone(),
            ..Default::default()
        };

        if let Some(ref background) = doc.background {
            frame.background_color = background.color.as_deref().and_then(Rgb::parse_hex);
            if let Some(ref source) = background.image {
                // Failures are already reported by the image cache
                frame.background_image = self
                    .caches
                    .images
                    .resolve(self.host.as_ref(), source)
                    .await
                    .ok();
            }
        }

        frame
    }
}

fn prefixed_heading(block: &ContentBlock, prefix: &TitlePrefixSpec) -> ContentBlock {
    let mut block = block.clone();
    if let ContentBlock::Heading {
        ref mut text,
        ref mut spans,
        ..
    } = block
    {
        text.insert_str(0, &prefix.text);
        if !spans.is_empty() {
            spans.insert(
                0,
                InlineSpan {
                    text: prefix.text.clone(),
                    ..Default::default()
                },
            );
        }
    }
    block
}

fn footnote_text(footnote: &Footnote) -> String {
    if footnote.label.is_empty() {
        footnote.text.clone()
    } else {
        format!("{} {}", footnote.label, footnote.text)
    }
}
