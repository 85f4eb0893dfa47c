//! End-to-end reconciliation tests through the message service.
//!
//! Tests verify:
//! - Skip, render and prune across consecutive submissions
//! - Reattachment to tagged slides after a restart
//! - Font fallback for a whole class
//! - Image sharing and the link allow-list
//! - Text truncation reaching the host

use std::sync::Arc;

use serde_json::json;

use slide_sync::model::OutboundMessage;
use slide_sync::payload::TRUNCATION_MARKER;
use slide_sync::render::{TextNode, VisualNode};
use slide_sync::{MemoryDocument, MemoryHost};

use super::test_utils::{
    generate_message, paragraph_slide, paragraphs, png_bytes, restarted, service_for,
    test_service, titled_slide,
};

fn top_level_texts(host: &MemoryHost, index: usize) -> Vec<TextNode> {
    host.slides()[index]
        .children
        .iter()
        .filter_map(|node| match node {
            VisualNode::Text(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn image_count(host: &MemoryHost, index: usize) -> usize {
    host.slides()[index]
        .children
        .iter()
        .filter(|node| matches!(node, VisualNode::Image(_)))
        .count()
}

// =============================================================================
// Skip / Render / Prune
// =============================================================================

#[tokio::test]
async fn test_two_slides_then_first_only() {
    let (host, service) = test_service();

    let reply = service.handle(paragraphs(&["A", "B"])).await;
    assert_eq!(reply, OutboundMessage::Success { count: 2 });

    let first_id = service.reconciler().records().await[&0].node_id.clone();
    let before = host.counters();

    let reply = service.handle(paragraphs(&["A"])).await;
    assert_eq!(reply, OutboundMessage::Success { count: 1 });

    let after = host.counters();
    assert_eq!(after.destroys, before.destroys + 1);
    // Slide 0 was skipped: not cleared, not appended to
    assert_eq!(after.clears, before.clears);
    assert_eq!(after.appends, before.appends);

    let records = service.reconciler().records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[&0].node_id, first_id);
    assert_eq!(host.slide_count(), 1);
}

#[tokio::test]
async fn test_identical_resubmission_changes_nothing() {
    let (host, service) = test_service();
    let message = generate_message(vec![
        titled_slide("Intro", "Hello"),
        titled_slide("Plan", "Ship it"),
        paragraph_slide("Questions?"),
    ]);

    service.handle(message.clone()).await;
    let document = host.document();
    let counters = host.counters();

    let reply = service.handle(message).await;
    assert_eq!(reply, OutboundMessage::Success { count: 3 });
    assert_eq!(host.document(), document);
    assert_eq!(host.counters(), counters);
}

#[tokio::test]
async fn test_edit_keeps_slide_identity() {
    let (host, service) = test_service();

    service.handle(paragraphs(&["A", "B"])).await;
    let ids: Vec<_> = host.slides().into_iter().map(|s| s.id).collect();

    service.handle(paragraphs(&["A", "B edited"])).await;
    let after: Vec<_> = host.slides().into_iter().map(|s| s.id).collect();

    assert_eq!(ids, after);
    assert_eq!(host.counters().clears, 1);
    assert_eq!(top_level_texts(&host, 1)[0].characters, "B edited");
}

#[tokio::test]
async fn test_growing_deck_appends_new_slides() {
    let (host, service) = test_service();

    service.handle(paragraphs(&["A"])).await;
    service.handle(paragraphs(&["A", "B", "C"])).await;

    assert_eq!(host.slide_count(), 3);
    assert_eq!(host.counters().creates, 3);
    let tags: Vec<String> = host.tags().into_iter().map(|(tag, _)| tag).collect();
    assert_eq!(tags.len(), 3);
}

// =============================================================================
// Restart
// =============================================================================

#[tokio::test]
async fn test_reattach_after_restart() {
    let (host, service) = test_service();
    service.handle(paragraphs(&["A", "B"])).await;
    let ids: Vec<_> = host.slides().into_iter().map(|s| s.id).collect();

    let host = restarted(&host);
    let service = service_for(host.clone());

    let reply = service.handle(paragraphs(&["A", "B"])).await;
    assert_eq!(reply, OutboundMessage::Success { count: 2 });

    // Same nodes, rebuilt in place
    assert_eq!(host.counters().creates, 0);
    assert_eq!(host.counters().destroys, 0);
    let after: Vec<_> = host.slides().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, after);
}

#[tokio::test]
async fn test_reattach_through_document_file() {
    let path = std::env::temp_dir().join(format!(
        "slide-sync-reattach-{}.json",
        std::process::id()
    ));

    let (host, service) = test_service();
    service.handle(paragraphs(&["A", "B", "C"])).await;
    host.document().save(&path).await.unwrap();

    let document = MemoryDocument::load(&path).await.unwrap();
    let host = Arc::new(MemoryHost::with_document(document));
    let service = service_for(host.clone());

    let reply = service.handle(paragraphs(&["A"])).await;
    assert_eq!(reply, OutboundMessage::Success { count: 1 });
    assert_eq!(host.slide_count(), 1);
    assert_eq!(host.counters().creates, 0);
    assert_eq!(host.counters().destroys, 2);

    let _ = std::fs::remove_file(&path);
}

// =============================================================================
// Styles
// =============================================================================

#[tokio::test]
async fn test_missing_font_family_falls_back() {
    let (host, service) = test_service();

    let slide = json!({
        "blocks": [{ "kind": "heading", "level": 1, "text": "Title" }],
        "style": { "heading1": { "font": { "family": "Lora" } } }
    });
    let reply = service.handle(generate_message(vec![slide])).await;
    assert_eq!(reply, OutboundMessage::Success { count: 1 });

    let heading = &top_level_texts(&host, 0)[0];
    assert_eq!(heading.characters, "Title");
    assert_eq!(heading.font.family, "Inter");
    assert!(!host.notifications().is_empty());

    // The failure is memoized: a second slide asking for it adds no notices
    let notices = host.notifications().len();
    let slide = json!({
        "blocks": [{ "kind": "heading", "level": 1, "text": "Other" }],
        "style": { "heading1": { "font": { "family": "Lora" } } }
    });
    service.handle(generate_message(vec![slide])).await;
    assert_eq!(host.notifications().len(), notices);
}

// =============================================================================
// Images and Links
// =============================================================================

#[tokio::test]
async fn test_shared_embedded_image_uploaded_once() {
    let (host, service) = test_service();

    let image = json!({ "kind": "image", "source": { "type": "embedded", "data": png_bytes() } });
    let message = generate_message(vec![
        json!({ "blocks": [image.clone(), { "kind": "paragraph", "text": "one" }] }),
        json!({ "blocks": [image, { "kind": "paragraph", "text": "two" }] }),
    ]);

    let reply = service.handle(message).await;
    assert_eq!(reply, OutboundMessage::Success { count: 2 });
    assert_eq!(host.counters().image_uploads, 1);
    assert_eq!(image_count(&host, 0), 1);
    assert_eq!(image_count(&host, 1), 1);
}

#[tokio::test]
async fn test_remote_images_respect_allow_list() {
    let allowed = "https://raw.githubusercontent.com/acme/deck/main/logo.png";
    let host = Arc::new(MemoryHost::new().with_remote_image(allowed, png_bytes()));
    let service = service_for(host.clone());

    let slide = json!({
        "blocks": [
            { "kind": "image", "source": { "type": "remote", "url": allowed } },
            { "kind": "image", "source": { "type": "remote", "url": "https://tracker.example/pixel.png" } },
            { "kind": "paragraph", "text": "see ", "spans": [
                { "text": "docs", "link": "https://evil.example/phish" }
            ] }
        ]
    });

    let reply = service.handle(generate_message(vec![slide])).await;
    assert_eq!(reply, OutboundMessage::Success { count: 1 });

    // Only the allowed image was ever fetched
    assert_eq!(host.counters().image_fetches, 1);
    assert_eq!(image_count(&host, 0), 1);

    let paragraph = &top_level_texts(&host, 0)[0];
    assert_eq!(paragraph.characters, "docs");
    assert!(paragraph.runs.iter().all(|run| run.link.is_none()));
}

// =============================================================================
// Sanitization
// =============================================================================

#[tokio::test]
async fn test_oversized_text_is_truncated() {
    let (host, service) = test_service();

    let text = "a".repeat(100_001);
    let reply = service.handle(paragraphs(&[text.as_str()])).await;
    assert_eq!(reply, OutboundMessage::Success { count: 1 });

    let paragraph = &top_level_texts(&host, 0)[0];
    assert!(paragraph.characters.ends_with(TRUNCATION_MARKER));
    assert_eq!(
        paragraph.characters.chars().count(),
        100_000 + TRUNCATION_MARKER.chars().count()
    );
}
