//! Shared helpers for the integration tests.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use slide_sync::{
    create_router, BasicRenderer, MemoryDocument, MemoryHost, PayloadValidator, Reconciler,
    RouterConfig, SlideService,
};

pub type TestService = SlideService<MemoryHost, BasicRenderer>;

// =============================================================================
// Service Construction
// =============================================================================

/// A service over `host` with default limits.
pub fn service_for(host: Arc<MemoryHost>) -> TestService {
    let reconciler = Reconciler::new(host, BasicRenderer::new());
    SlideService::new(PayloadValidator::default(), Arc::new(reconciler))
}

/// A fresh host and a service over it.
pub fn test_service() -> (Arc<MemoryHost>, TestService) {
    let host = Arc::new(MemoryHost::new());
    let service = service_for(host.clone());
    (host, service)
}

/// A fresh host and a router over it, tracing disabled.
pub fn test_router() -> (Arc<MemoryHost>, Router) {
    let (host, service) = test_service();
    let router = create_router(service, RouterConfig::new().with_tracing(false));
    (host, router)
}

/// Simulate a process restart: a new host over a copy of the old document.
pub fn restarted(host: &MemoryHost) -> Arc<MemoryHost> {
    let document: MemoryDocument = host.document();
    Arc::new(MemoryHost::with_document(document))
}

// =============================================================================
// Payload Builders
// =============================================================================

pub fn generate_message(slides: Vec<Value>) -> Value {
    json!({ "type": "generate-slides", "slides": slides })
}

pub fn paragraph_slide(text: &str) -> Value {
    json!({ "blocks": [{ "kind": "paragraph", "text": text }] })
}

pub fn titled_slide(title: &str, body: &str) -> Value {
    json!({
        "blocks": [
            { "kind": "heading", "level": 1, "text": title },
            { "kind": "paragraph", "text": body }
        ]
    })
}

/// Message with one paragraph slide per text.
pub fn paragraphs(texts: &[&str]) -> Value {
    generate_message(texts.iter().map(|t| paragraph_slide(t)).collect())
}

/// A small valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

// =============================================================================
// HTTP Helpers
// =============================================================================

pub async fn post_json(router: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(router, request).await
}

pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}
