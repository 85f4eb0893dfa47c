//! HTTP server layer for slide-sync.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     POST /generate-slides    GET /records    GET /health        │
//! │                                                                 │
//! │  ┌──────────────────────┐      ┌─────────────────────────────┐  │
//! │  │      handlers        │      │          routes             │  │
//! │  │ (requests, errors)   │      │  (router, CORS, tracing)    │  │
//! │  └──────────────────────┘      └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                         SlideService
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    generate_slides_handler, health_handler, records_handler, AppState, HealthResponse,
    RecordEntry, RecordsResponse,
};
pub use routes::{build_router, create_router, RouterConfig};
