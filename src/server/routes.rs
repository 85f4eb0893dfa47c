//! Router configuration for slide-sync.
//!
//! # Route Structure
//!
//! ```text
//! /health            - Health check
//! /generate-slides   - Submit a slide list (POST)
//! /records           - Record map snapshot
//! ```
//!
//! # Example
//!
//! ```ignore
//! use slide_sync::server::routes::{create_router, RouterConfig};
//!
//! let router = create_router(service, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{generate_slides_handler, health_handler, records_handler, AppState};
use crate::engine::SlideService;
use crate::host::Host;
use crate::render::NodeRenderer;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Any origin allowed, tracing enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router around a slide service.
pub fn create_router<H, R>(service: SlideService<H, R>, config: RouterConfig) -> Router
where
    H: Host + 'static,
    R: NodeRenderer + 'static,
{
    build_router(AppState::new(service), &config)
}

/// Build the router from existing state.
pub fn build_router<H, R>(app_state: AppState<H, R>, config: &RouterConfig) -> Router
where
    H: Host + 'static,
    R: NodeRenderer + 'static,
{
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/generate-slides", post(generate_slides_handler::<H, R>))
        .route("/records", get(records_handler::<H, R>))
        .with_state(app_state)
        .layer(build_cors_layer(config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_config_defaults() {
        let config = RouterConfig::new();
        assert!(config.cors_origins.is_none());
        assert!(config.enable_tracing);
    }

    #[test]
    fn test_router_config_builder() {
        let config = RouterConfig::new()
            .with_cors_origins(vec!["https://www.figma.com".to_string()])
            .with_tracing(false);

        assert_eq!(
            config.cors_origins,
            Some(vec!["https://www.figma.com".to_string()])
        );
        assert!(!config.enable_tracing);

        let config = config.with_cors_any_origin();
        assert!(config.cors_origins.is_none());
    }

    #[test]
    fn test_build_cors_layer_variants() {
        let _any = build_cors_layer(&RouterConfig::new());
        let _none = build_cors_layer(&RouterConfig::new().with_cors_origins(vec![]));
        let _some = build_cors_layer(
            &RouterConfig::new().with_cors_origins(vec!["https://www.figma.com".to_string()]),
        );
    }
}
