//! HTTP request handlers for the slide-sync API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `POST /generate-slides` - Reconcile the document to a slide list
//! - `GET /records` - Slides the engine currently tracks

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::engine::{RenderedSlideRecord, SlideService, Submission};
use crate::error::{MessageError, ServiceError};
use crate::host::Host;
use crate::model::OutboundMessage;
use crate::render::NodeRenderer;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the slide service.
pub struct AppState<H, R> {
    pub service: Arc<SlideService<H, R>>,
}

impl<H, R> AppState<H, R> {
    pub fn new(service: SlideService<H, R>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

impl<H, R> Clone for AppState<H, R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// One entry of the record map.
#[derive(Debug, Serialize)]
pub struct RecordEntry {
    pub index: usize,
    #[serde(flatten)]
    pub record: RenderedSlideRecord,
}

/// Response from the records endpoint.
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub count: usize,
    pub records: Vec<RecordEntry>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ServiceError to HTTP response.
///
/// The body is the same `error` message the engine sends back to the
/// authoring side. Rejected payloads are 400 and logged at WARN, failed runs
/// are 500 and logged at ERROR.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = if self.is_rejection() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), "Run failed: {}", message);
        } else {
            warn!(status = status.as_u16(), "Client error: {}", message);
        }

        (status, Json(OutboundMessage::error(message))).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle slide generation requests.
///
/// # Endpoint
///
/// `POST /generate-slides`
///
/// The body is a `generate-slides` message:
///
/// ```json
/// { "type": "generate-slides", "slides": [ { "blocks": [...] } ] }
/// ```
///
/// # Responses
///
/// - `200 OK`: `{"type": "success", "count": n}`
/// - `202 Accepted`: `{"type": "superseded"}`, a newer request replaced this one
///   before it ran
/// - `400 Bad Request`: the body is not JSON, or the message or payload was
///   rejected
/// - `500 Internal Server Error`: the run failed
pub async fn generate_slides_handler<H, R>(
    State(state): State<AppState<H, R>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    H: Host + 'static,
    R: NodeRenderer + 'static,
{
    let Json(body) =
        payload.map_err(|rejection| MessageError::Invalid(rejection.body_text()))?;

    match state.service.submit(body).await? {
        Submission::Completed(report) => {
            debug!(
                rendered = report.rendered,
                skipped = report.skipped,
                destroyed = report.destroyed,
                "Generate request completed"
            );
            Ok((
                StatusCode::OK,
                Json(OutboundMessage::Success {
                    count: report.count,
                }),
            )
                .into_response())
        }
        Submission::Superseded => {
            Ok((StatusCode::ACCEPTED, Json(OutboundMessage::Superseded)).into_response())
        }
    }
}

/// Handle record listing requests.
///
/// # Endpoint
///
/// `GET /records`
pub async fn records_handler<H, R>(State(state): State<AppState<H, R>>) -> Json<RecordsResponse>
where
    H: Host + 'static,
    R: NodeRenderer + 'static,
{
    let records: Vec<RecordEntry> = state
        .service
        .reconciler()
        .records()
        .await
        .into_iter()
        .map(|(index, record)| RecordEntry { index, record })
        .collect();

    Json(RecordsResponse {
        count: records.len(),
        records,
    })
}
