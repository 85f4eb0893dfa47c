//! Reconciliation engine.
//!
//! ```text
//!   raw message ──► SlideService ──► PayloadValidator
//!                        │
//!                        ▼
//!                 CoalescingQueue   (one run at a time, newest pending wins)
//!                        │
//!                        ▼
//!                   Reconciler ──► discover tags ─► skip / render ─► prune
//!                        │
//!                        ├── ResourceCaches
//!                        ├── NodeRenderer
//!                        └── Host
//! ```

pub mod queue;
pub mod reconciler;
pub mod service;

pub use queue::{CoalescingQueue, Submission, Ticket};
pub use reconciler::{Reconciler, RenderedSlideRecord, RunReport};
pub use service::SlideService;
