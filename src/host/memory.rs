//! In-memory host.
//!
//! Backs the CLI, the HTTP server and the tests. The document can be saved to
//! and loaded from a JSON file, which is how tags survive a process restart:
//! a fresh engine pointed at a reloaded document reattaches to the slides a
//! previous process created.
//!
//! Appends are validated the way a real rendering host would: every image,
//! template, library style and font a subtree references must still be valid
//! on the host, otherwise the append fails with the matching [`HostError`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    ImageHandle, NodeId, ResourceHost, SceneHost, SlideFrame, StyleHandle, TaggedNode,
};
use crate::error::{HostError, ResourceKind};
use crate::render::VisualNode;
use crate::style::{FontName, FontRequest, DEFAULT_CODE_FONT_FAMILY, DEFAULT_FONT_FAMILY};

// =============================================================================
// Document
// =============================================================================

/// One slide node and its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySlide {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub frame: SlideFrame,
    #[serde(default)]
    pub children: Vec<VisualNode>,
}

/// Persistent state of a [`MemoryHost`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDocument {
    /// Slide nodes in creation order
    #[serde(default)]
    pub slides: Vec<MemorySlide>,

    /// Template nodes by name
    #[serde(default)]
    pub templates: BTreeMap<String, NodeId>,

    /// Library style keys that can be imported
    #[serde(default)]
    pub library: BTreeSet<String>,

    /// Handles of uploaded images that are still valid
    #[serde(default)]
    pub images: BTreeSet<ImageHandle>,

    /// Handles of imported library styles that are still valid
    #[serde(default)]
    pub imported_styles: BTreeSet<StyleHandle>,

    #[serde(default)]
    next_id: u64,
}

impl MemoryDocument {
    /// Load a document from a JSON file. A missing file is an empty document.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref();
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No document on disk, starting empty");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(HostError::Other(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_slice(&data)
            .map_err(|e| HostError::Other(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Write the document as pretty-printed JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), HostError> {
        let path = path.as_ref();
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| HostError::Other(format!("Failed to encode document: {}", e)))?;
        tokio::fs::write(path, data)
            .await
            .map_err(|e| HostError::Other(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn allocate(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}:{}", prefix, self.next_id)
    }

    fn slide_mut(&mut self, id: &NodeId) -> Result<&mut MemorySlide, HostError> {
        self.slides
            .iter_mut()
            .find(|slide| &slide.id == id)
            .ok_or_else(|| HostError::NodeNotFound(id.to_string()))
    }

    /// Check that every handle `node` references is still valid.
    fn check_references(&self, node: &VisualNode) -> Result<(), HostError> {
        if let Some(image) = node.images().into_iter().find(|h| !self.images.contains(*h)) {
            return Err(HostError::StaleReference {
                kind: ResourceKind::Image,
                id: image.0.clone(),
            });
        }

        let templates: HashSet<&NodeId> = self.templates.values().collect();
        if let Some(template) = node.templates().into_iter().find(|t| !templates.contains(*t)) {
            return Err(HostError::StaleReference {
                kind: ResourceKind::Node,
                id: template.to_string(),
            });
        }

        if let Some(style) = node
            .library_styles()
            .into_iter()
            .find(|s| !self.imported_styles.contains(*s))
        {
            return Err(HostError::StaleReference {
                kind: ResourceKind::Style,
                id: style.0.clone(),
            });
        }

        Ok(())
    }
}

// =============================================================================
// Counters and Failure Injection
// =============================================================================

/// Number of calls made to each host primitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostCounters {
    pub font_loads: usize,
    pub image_uploads: usize,
    pub image_fetches: usize,
    pub template_lookups: usize,
    pub style_imports: usize,
    pub creates: usize,
    pub destroys: usize,
    pub clears: usize,
    pub appends: usize,
}

#[derive(Debug, Default)]
struct Failures {
    list_tagged: bool,
    destroy: bool,
    append_marker: Option<String>,
}

// =============================================================================
// Host
// =============================================================================

/// A [`SceneHost`] and [`ResourceHost`] backed by a [`MemoryDocument`].
pub struct MemoryHost {
    document: Mutex<MemoryDocument>,

    /// Fonts that `load_font` can load
    installed_fonts: HashSet<FontName>,

    /// Fonts loaded so far; appends referencing other fonts fail
    loaded_fonts: Mutex<HashSet<FontName>>,

    /// Bytes served by `fetch_image`, by URL
    remote_images: HashMap<String, Bytes>,

    notifications: Mutex<Vec<String>>,
    counters: Mutex<HostCounters>,
    failures: Mutex<Failures>,
}

impl MemoryHost {
    /// Empty document with the default text and code families installed.
    pub fn new() -> Self {
        Self::with_document(MemoryDocument::default())
    }

    /// Host over an existing document, e.g. one loaded from disk.
    pub fn with_document(document: MemoryDocument) -> Self {
        let installed_fonts = [DEFAULT_FONT_FAMILY, DEFAULT_CODE_FONT_FAMILY]
            .into_iter()
            .flat_map(|family| FontRequest::family(family).font_names())
            .collect();

        Self {
            document: Mutex::new(document),
            installed_fonts,
            loaded_fonts: Mutex::new(HashSet::new()),
            remote_images: HashMap::new(),
            notifications: Mutex::new(Vec::new()),
            counters: Mutex::new(HostCounters::default()),
            failures: Mutex::new(Failures::default()),
        }
    }

    /// Install every canonical variant of `family`.
    pub fn with_font_family(mut self, family: &str) -> Self {
        self.installed_fonts
            .extend(FontRequest::family(family).font_names());
        self
    }

    /// Install a single (family, variant) pair.
    pub fn with_font(mut self, font: FontName) -> Self {
        self.installed_fonts.insert(font);
        self
    }

    /// Serve `data` for `url` from `fetch_image`.
    pub fn with_remote_image(mut self, url: &str, data: impl Into<Bytes>) -> Self {
        self.remote_images.insert(url.to_string(), data.into());
        self
    }

    /// Make a library style importable.
    pub fn with_library_style(self, key: &str) -> Self {
        lock(&self.document).library.insert(key.to_string());
        self
    }

    /// Create a template node that can be cloned by name.
    pub fn add_template(&self, name: &str) -> NodeId {
        let mut doc = lock(&self.document);
        let id = NodeId(doc.allocate("template"));
        doc.templates.insert(name.to_string(), id.clone());
        id
    }

    /// Delete a template node. Clones made from it become stale.
    pub fn remove_template(&self, name: &str) -> Option<NodeId> {
        lock(&self.document).templates.remove(name)
    }

    /// Invalidate every uploaded image handle.
    pub fn revoke_images(&self) {
        let mut doc = lock(&self.document);
        info!(count = doc.images.len(), "Revoking uploaded images");
        doc.images.clear();
    }

    /// Invalidate every imported library style handle.
    pub fn revoke_styles(&self) {
        lock(&self.document).imported_styles.clear();
    }

    /// Make `list_tagged` fail.
    pub fn fail_list_tagged(&self, fail: bool) {
        lock(&self.failures).list_tagged = fail;
    }

    /// Make `destroy` fail.
    pub fn fail_destroy(&self, fail: bool) {
        lock(&self.failures).destroy = fail;
    }

    /// Make appends fail when a text node in the subtree contains `marker`.
    pub fn fail_appends_containing(&self, marker: Option<&str>) {
        lock(&self.failures).append_marker = marker.map(str::to_string);
    }

    /// Snapshot of the document.
    pub fn document(&self) -> MemoryDocument {
        lock(&self.document).clone()
    }

    /// Snapshot of every slide node, in creation order.
    pub fn slides(&self) -> Vec<MemorySlide> {
        lock(&self.document).slides.clone()
    }

    pub fn slide(&self, id: &NodeId) -> Option<MemorySlide> {
        lock(&self.document)
            .slides
            .iter()
            .find(|slide| &slide.id == id)
            .cloned()
    }

    /// Tagged slides as (tag, id), in creation order.
    pub fn tags(&self) -> Vec<(String, NodeId)> {
        lock(&self.document)
            .slides
            .iter()
            .filter_map(|slide| slide.tag.clone().map(|tag| (tag, slide.id.clone())))
            .collect()
    }

    pub fn slide_count(&self) -> usize {
        lock(&self.document).slides.len()
    }

    /// Every message shown to the user so far.
    pub fn notifications(&self) -> Vec<String> {
        lock(&self.notifications).clone()
    }

    pub fn counters(&self) -> HostCounters {
        lock(&self.counters).clone()
    }

    fn count(&self, f: impl FnOnce(&mut HostCounters)) {
        f(&mut lock(&self.counters));
    }

    fn check_fonts(&self, node: &VisualNode) -> Result<(), HostError> {
        let loaded = lock(&self.loaded_fonts);
        match node.fonts().into_iter().find(|font| !loaded.contains(*font)) {
            Some(font) => Err(HostError::FontUnavailable(format!(
                "{} {} is not loaded",
                font.family, font.style
            ))),
            None => Ok(()),
        }
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn contains_text(node: &VisualNode, marker: &str) -> bool {
    match node {
        VisualNode::Text(text) => text.characters.contains(marker),
        VisualNode::Frame(frame) => frame.children.iter().any(|c| contains_text(c, marker)),
        VisualNode::Clone(clone) => clone.text_overrides.values().any(|v| v.contains(marker)),
        VisualNode::Image(_) => false,
    }
}

#[async_trait]
impl SceneHost for MemoryHost {
    async fn list_tagged(&self) -> Result<Vec<TaggedNode>, HostError> {
        if lock(&self.failures).list_tagged {
            return Err(HostError::Other("document unavailable".to_string()));
        }

        Ok(lock(&self.document)
            .slides
            .iter()
            .filter_map(|slide| {
                slide.tag.as_ref().map(|tag| TaggedNode {
                    id: slide.id.clone(),
                    tag: tag.clone(),
                })
            })
            .collect())
    }

    async fn create_slide(&self) -> Result<NodeId, HostError> {
        self.count(|c| c.creates += 1);
        let mut doc = lock(&self.document);
        let id = NodeId(doc.allocate("slide"));
        doc.slides.push(MemorySlide {
            id: id.clone(),
            tag: None,
            frame: SlideFrame::default(),
            children: Vec::new(),
        });
        Ok(id)
    }

    async fn clear_slide(&self, id: &NodeId) -> Result<(), HostError> {
        self.count(|c| c.clears += 1);
        let mut doc = lock(&self.document);
        let slide = doc.slide_mut(id)?;
        slide.children.clear();
        slide.frame = SlideFrame::default();
        Ok(())
    }

    async fn destroy(&self, id: &NodeId) -> Result<(), HostError> {
        if lock(&self.failures).destroy {
            return Err(HostError::Other(format!("cannot destroy {}", id)));
        }

        self.count(|c| c.destroys += 1);
        let mut doc = lock(&self.document);
        let before = doc.slides.len();
        doc.slides.retain(|slide| &slide.id != id);
        if doc.slides.len() == before {
            return Err(HostError::NodeNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_tag(&self, id: &NodeId, tag: &str) -> Result<(), HostError> {
        lock(&self.document).slide_mut(id)?.tag = Some(tag.to_string());
        Ok(())
    }

    async fn configure_slide(&self, id: &NodeId, frame: &SlideFrame) -> Result<(), HostError> {
        let mut doc = lock(&self.document);
        if let Some(ref image) = frame.background_image {
            if !doc.images.contains(image) {
                return Err(HostError::StaleReference {
                    kind: ResourceKind::Image,
                    id: image.0.clone(),
                });
            }
        }
        doc.slide_mut(id)?.frame = frame.clone();
        Ok(())
    }

    async fn append(&self, parent: &NodeId, node: VisualNode) -> Result<(), HostError> {
        self.count(|c| c.appends += 1);

        if let Some(ref marker) = lock(&self.failures).append_marker {
            if contains_text(&node, marker) {
                return Err(HostError::Other(format!(
                    "append rejected for node \"{}\"",
                    node.name()
                )));
            }
        }

        self.check_fonts(&node)?;

        let mut doc = lock(&self.document);
        doc.check_references(&node)?;
        doc.slide_mut(parent)?.children.push(node);
        Ok(())
    }
}

#[async_trait]
impl ResourceHost for MemoryHost {
    async fn load_font(&self, font: &FontName) -> Result<(), HostError> {
        self.count(|c| c.font_loads += 1);
        if !self.installed_fonts.contains(font) {
            return Err(HostError::FontUnavailable(format!(
                "{} {}",
                font.family, font.style
            )));
        }
        lock(&self.loaded_fonts).insert(font.clone());
        Ok(())
    }

    async fn import_style(&self, key: &str) -> Result<StyleHandle, HostError> {
        self.count(|c| c.style_imports += 1);
        let mut doc = lock(&self.document);
        if !doc.library.contains(key) {
            return Err(HostError::StyleUnavailable(key.to_string()));
        }
        let handle = StyleHandle(doc.allocate("style"));
        doc.imported_styles.insert(handle.clone());
        Ok(handle)
    }

    async fn upload_image(&self, data: Bytes) -> Result<ImageHandle, HostError> {
        self.count(|c| c.image_uploads += 1);
        let format = image::guess_format(&data)
            .map_err(|e| HostError::ImageUnavailable(format!("unrecognized image data: {}", e)))?;

        let mut doc = lock(&self.document);
        let handle = ImageHandle(doc.allocate("image"));
        debug!(handle = %handle.0, format = ?format, bytes = data.len(), "Uploaded image");
        doc.images.insert(handle.clone());
        Ok(handle)
    }

    async fn fetch_image(&self, url: &str) -> Result<Bytes, HostError> {
        self.count(|c| c.image_fetches += 1);
        self.remote_images
            .get(url)
            .cloned()
            .ok_or_else(|| HostError::ImageUnavailable(format!("failed to fetch {}", url)))
    }

    async fn find_template(&self, name: &str) -> Result<Option<NodeId>, HostError> {
        self.count(|c| c.template_lookups += 1);
        Ok(lock(&self.document).templates.get(name).cloned())
    }

    fn notify(&self, message: &str) {
        lock(&self.notifications).push(message.to_string());
    }
}
