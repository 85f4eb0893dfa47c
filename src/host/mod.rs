//! Host platform contract.
//!
//! The engine never talks to a concrete rendering SDK. It depends on two
//! traits:
//!
//! - [`SceneHost`]: the identity adapter (list tagged nodes, tag, destroy) plus
//!   the node mutations a run performs (create, clear, configure, append)
//! - [`ResourceHost`]: fallible font/image/style/template primitives and
//!   user-facing notifications
//!
//! [`MemoryHost`] implements both in memory and can persist its document to
//! disk so that node tags survive a process restart.

pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::model::TransitionSpec;
use crate::render::VisualNode;
use crate::style::{FontName, Rgb};

pub use memory::{HostCounters, MemoryDocument, MemoryHost};

// =============================================================================
// Handles
// =============================================================================

/// Stable identifier of a host node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-native handle to an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHandle(pub String);

/// Host-native handle to an imported library style.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleHandle(pub String);

/// A node carrying a tag, as returned by [`SceneHost::list_tagged`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedNode {
    pub id: NodeId,
    pub tag: String,
}

/// Slide-level properties applied outside the block content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<ImageHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionSpec>,
}

// =============================================================================
// Traits
// =============================================================================

/// Scene graph operations used by the reconciliation engine.
#[async_trait]
pub trait SceneHost: Send + Sync {
    /// Every slide node that currently carries a tag.
    async fn list_tagged(&self) -> Result<Vec<TaggedNode>, HostError>;

    /// Create an empty slide node.
    async fn create_slide(&self) -> Result<NodeId, HostError>;

    /// Remove all content from a slide node, keeping the node and its tag.
    async fn clear_slide(&self, id: &NodeId) -> Result<(), HostError>;

    /// Destroy a slide node.
    async fn destroy(&self, id: &NodeId) -> Result<(), HostError>;

    /// Write the opaque tag of a slide node.
    async fn set_tag(&self, id: &NodeId, tag: &str) -> Result<(), HostError>;

    /// Apply background and transition settings.
    async fn configure_slide(&self, id: &NodeId, frame: &SlideFrame) -> Result<(), HostError>;

    /// Append a rendered subtree to a slide node.
    async fn append(&self, parent: &NodeId, node: VisualNode) -> Result<(), HostError>;
}

/// Fallible resource primitives. Results are cached by [`crate::cache`].
#[async_trait]
pub trait ResourceHost: Send + Sync {
    async fn load_font(&self, font: &FontName) -> Result<(), HostError>;

    async fn import_style(&self, key: &str) -> Result<StyleHandle, HostError>;

    async fn upload_image(&self, data: Bytes) -> Result<ImageHandle, HostError>;

    async fn fetch_image(&self, url: &str) -> Result<Bytes, HostError>;

    /// Look up a node that can be cloned as a template, by name.
    async fn find_template(&self, name: &str) -> Result<Option<NodeId>, HostError>;

    /// Show a message to the user.
    fn notify(&self, message: &str);
}

/// Everything the engine needs from a host.
pub trait Host: SceneHost + ResourceHost {}

impl<T: SceneHost + ResourceHost> Host for T {}
