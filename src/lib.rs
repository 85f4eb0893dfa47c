//! # slide-sync
//!
//! Keeps a slide deck in a design document in sync with a list of slide
//! descriptions produced by an authoring tool.
//!
//! Every submission describes the whole deck. The engine compares it with what
//! it rendered before and only rebuilds the slides whose content changed,
//! reusing the existing slide node so its identity survives an edit.
//!
//! ## Features
//!
//! - **Incremental runs**: slides are skipped when their content hash is unchanged
//! - **Stable identity**: slide nodes are tagged with their index and reattached after a restart
//! - **Pruning**: extra and duplicate slides are removed at the end of every run
//! - **Untrusted input**: payloads are bounded and links are checked against an allow-list
//! - **Shared resources**: fonts, styles, images and templates are loaded once per process
//! - **Back-pressure**: a burst of submissions collapses into the newest one
//!
//! ## Architecture
//!
//! - [`payload`] - Validation and sanitization of raw payloads
//! - [`hash`] - Content hashing of slides and images
//! - [`style`] - Style classes and font fallback
//! - [`cache`] - Singleflight resource caches
//! - [`render`] - Node renderer contract and the built-in renderer
//! - [`host`] - Host traits and the in-memory document
//! - [`engine`] - Reconciler, latest-wins queue and message service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use slide_sync::{BasicRenderer, MemoryHost, PayloadValidator, Reconciler, SlideService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let host = Arc::new(MemoryHost::new());
//!     let reconciler = Reconciler::new(host, BasicRenderer::new());
//!     let service = SlideService::new(PayloadValidator::default(), Arc::new(reconciler));
//!
//!     let reply = service
//!         .handle(json!({
//!             "type": "generate-slides",
//!             "slides": [{ "blocks": [{ "kind": "heading", "level": 1, "text": "Hello" }] }]
//!         }))
//!         .await;
//!     println!("{:?}", reply);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod host;
pub mod model;
pub mod payload;
pub mod render;
pub mod server;
pub mod style;

// Re-export commonly used types
pub use cache::{ResourceCache, ResourceCaches};
pub use config::{ApplyConfig, Cli, Command, LimitsConfig, ServeConfig, ValidateConfig};
pub use engine::{
    CoalescingQueue, Reconciler, RenderedSlideRecord, RunReport, SlideService, Submission, Ticket,
};
pub use error::{
    HostError, MessageError, QueueError, ReconcileError, RenderError, ResourceError,
    ResourceKind, ServiceError, ValidationError,
};
pub use hash::{hash, hash_bytes, hash_bytes_sampled, hash_sampled, hash_slide, ContentHash};
pub use host::{Host, MemoryDocument, MemoryHost, NodeId, ResourceHost, SceneHost};
pub use model::{ContentBlock, InboundMessage, OutboundMessage, SlideDocument};
pub use payload::{PayloadValidator, SanitizeReport, ValidatedPayload, ValidatorConfig};
pub use render::{BasicRenderer, NodeRenderer, RenderContext, VisualNode};
pub use server::{create_router, AppState, RouterConfig};
pub use style::{ResolvedStyleSet, StyleClass};
