//! API integration tests for the HTTP surface.
//!
//! Tests verify:
//! - Health and records endpoints
//! - Generate requests and their status codes
//! - Error bodies for rejected payloads and failed runs
//! - CORS preflight handling

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use slide_sync::{create_router, RouterConfig};

use super::test_utils::{
    generate_message, get_json, paragraphs, post_json, test_router, test_service, titled_slide,
};

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_host, router) = test_router();

    let (status, health) = get_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert!(health["version"].is_string());
}

// =============================================================================
// Generate Endpoint
// =============================================================================

#[tokio::test]
async fn test_generate_success() {
    let (host, router) = test_router();

    let message = generate_message(vec![
        titled_slide("Intro", "Hello"),
        titled_slide("Details", "World"),
    ]);
    let (status, body) = post_json(&router, "/generate-slides", &message).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "type": "success", "count": 2 }));
    assert_eq!(host.slide_count(), 2);
}

#[tokio::test]
async fn test_generate_empty_payload_rejected() {
    let (host, router) = test_router();

    let (status, body) = post_json(&router, "/generate-slides", &generate_message(vec![])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "error");
    assert_eq!(body["message"], "Payload contains no slides");
    assert_eq!(host.slide_count(), 0);
}

#[tokio::test]
async fn test_generate_slides_not_a_list() {
    let (_host, router) = test_router();

    let message = json!({ "type": "generate-slides", "slides": { "blocks": [] } });
    let (status, body) = post_json(&router, "/generate-slides", &message).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "error");
}

#[tokio::test]
async fn test_generate_too_many_slides() {
    let (host, router) = test_router();

    let texts: Vec<String> = (0..101).map(|i| format!("slide {}", i)).collect();
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
    let (status, body) = post_json(&router, "/generate-slides", &paragraphs(&texts)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("101"));
    assert_eq!(host.slide_count(), 0);
}

#[tokio::test]
async fn test_generate_unsupported_message_type() {
    let (_host, router) = test_router();

    let (status, body) = post_json(&router, "/generate-slides", &json!({ "type": "resize" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "error");
}

#[tokio::test]
async fn test_generate_malformed_json_body() {
    let (host, router) = test_router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate-slides")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"type\": \"generate-slides\", \"slides\": ["))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["type"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid message"));
    assert_eq!(host.slide_count(), 0);
}

#[tokio::test]
async fn test_generate_missing_content_type() {
    let (_host, router) = test_router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate-slides")
        .body(Body::from(paragraphs(&["A"]).to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["type"], "error");
}

#[tokio::test]
async fn test_generate_run_failure() {
    let (host, router) = test_router();
    host.fail_list_tagged(true);

    let (status, body) = post_json(&router, "/generate-slides", &paragraphs(&["A"])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to discover existing slides"));

    // The next request succeeds once the host recovers
    host.fail_list_tagged(false);
    let (status, _) = post_json(&router, "/generate-slides", &paragraphs(&["A"])).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_generate_shrinking_deck() {
    let (host, router) = test_router();

    let (status, _) = post_json(&router, "/generate-slides", &paragraphs(&["A", "B", "C"])).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&router, "/generate-slides", &paragraphs(&["A"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    assert_eq!(host.slide_count(), 1);
    assert_eq!(host.counters().destroys, 2);
}

// =============================================================================
// Records Endpoint
// =============================================================================

#[tokio::test]
async fn test_records_empty() {
    let (_host, router) = test_router();

    let (status, body) = get_json(&router, "/records").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["records"], json!([]));
}

#[tokio::test]
async fn test_records_after_generate() {
    let (host, router) = test_router();

    post_json(&router, "/generate-slides", &paragraphs(&["A", "B"])).await;

    let (status, body) = get_json(&router, "/records").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let records = body["records"].as_array().unwrap();
    assert_eq!(records[0]["index"], 0);
    assert_eq!(records[1]["index"], 1);

    let hash = records[0]["contentHash"].as_str().unwrap();
    assert_eq!(hash.len(), 32);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(records[0]["contentHash"], records[1]["contentHash"]);

    // Node ids point at the slides the host holds
    let ids: Vec<String> = host.slides().into_iter().map(|s| s.id.0).collect();
    for record in records {
        assert!(ids.contains(&record["nodeId"].as_str().unwrap().to_string()));
    }
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_preflight_any_origin() {
    let (_host, router) = test_router();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/generate-slides")
        .header(header::ORIGIN, "https://www.figma.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_restricted_origin() {
    let (_host, service) = test_service();
    let router = create_router(
        service,
        RouterConfig::new()
            .with_cors_origins(vec!["https://www.figma.com".to_string()])
            .with_tracing(false),
    );

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://www.figma.com")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://www.figma.com"
    );

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
