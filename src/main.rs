//! slide-sync - Reconciles a slide deck against a desired list of slides.
//!
//! This binary runs the HTTP server or applies a payload to a document file.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slide_sync::{
    config::{ApplyConfig, Cli, Command, ServeConfig, ValidateConfig},
    engine::{Reconciler, SlideService, Submission},
    host::{MemoryDocument, MemoryHost},
    model::{InboundMessage, OutboundMessage},
    payload::PayloadValidator,
    render::BasicRenderer,
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Apply(config) => run_apply(config).await,
        Command::Validate(config) => run_validate(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let validator_config = config.limits.validator_config();

    info!("slide-sync v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!(
        "  Limits: {} slides, {} blocks/slide, {} chars/text",
        validator_config.max_slides, validator_config.max_blocks, validator_config.max_text_chars
    );
    info!("  Allowed hosts: {}", validator_config.allowed_hosts.join(", "));

    let document = match &config.document {
        Some(path) => match MemoryDocument::load(path).await {
            Ok(document) => {
                info!(
                    "  Document: {} ({} slides)",
                    path.display(),
                    document.slides.len()
                );
                document
            }
            Err(e) => {
                error!("Failed to load document {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("  Document: in memory only, nothing is persisted");
            MemoryDocument::default()
        }
    };

    let host = Arc::new(MemoryHost::with_document(document));
    let reconciler = Reconciler::new(host.clone(), BasicRenderer::new());
    let service = SlideService::new(
        PayloadValidator::new(validator_config),
        Arc::new(reconciler),
    );

    let router = create_router(service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/records", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Some(path) = &config.document {
        if let Err(e) = host.document().save(path).await {
            error!("Failed to save document {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        info!("Document saved to {}", path.display());
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutting down");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "slide_sync=debug,tower_http=debug"
    } else {
        "slide_sync=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Apply Command
// =============================================================================

async fn run_apply(config: ApplyConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let message = match read_message(&config.payload).await {
        Ok(message) => message,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let document = match MemoryDocument::load(&config.document).await {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let host = Arc::new(MemoryHost::with_document(document));
    let reconciler = Reconciler::new(host.clone(), BasicRenderer::new());
    let service = SlideService::new(
        PayloadValidator::new(config.limits.validator_config()),
        Arc::new(reconciler),
    );

    let (reply, persist) = match service.submit(message).await {
        Ok(Submission::Completed(report)) => (
            OutboundMessage::Success {
                count: report.count,
            },
            true,
        ),
        Ok(Submission::Superseded) => (OutboundMessage::Superseded, false),
        // Slides touched before a failure are still on the document
        Err(e) => (OutboundMessage::error(e.to_string()), !e.is_rejection()),
    };

    if persist {
        if let Err(e) = host.document().save(&config.document).await {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match serde_json::to_string_pretty(&reply) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match reply {
        OutboundMessage::Success { .. } => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

// =============================================================================
// Validate Command
// =============================================================================

async fn run_validate(config: ValidateConfig) -> ExitCode {
    println!("slide-sync Payload Check");
    println!("════════════════════════");
    println!();

    if let Err(e) = config.limits.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let slides = match read_message(&config.payload).await.and_then(|message| {
        InboundMessage::from_value(message).map_err(|e| e.to_string())
    }) {
        Ok(InboundMessage::GenerateSlides { slides }) => slides,
        Err(e) => {
            println!("✗ Message: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let validator = PayloadValidator::new(config.limits.validator_config());
    let payload = match validator.validate(&slides) {
        Ok(payload) => payload,
        Err(e) => {
            println!("✗ Payload: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let blocks: usize = payload.slides.iter().map(|s| s.blocks.len()).sum();
    println!("✓ Slides: {}", payload.slides.len());
    println!("✓ Blocks: {}", blocks);
    println!();

    let report = payload.report;
    if report.is_clean() {
        println!("✓ Nothing was sanitized");
    } else {
        println!("Sanitized:");
        println!("  Truncated texts:        {}", report.truncated_texts);
        println!("  Truncated span lists:   {}", report.truncated_span_lists);
        println!("  Truncated bullet lists: {}", report.truncated_bullet_lists);
        println!("  Removed blocks:         {}", report.removed_blocks);
        println!("  Removed links:          {}", report.removed_links);
    }

    println!();
    println!("════════════════════════");
    println!("✓ Payload is valid");

    ExitCode::SUCCESS
}

// =============================================================================
// Helpers
// =============================================================================

/// Read a payload file as an inbound message.
///
/// A bare slide list is wrapped into a `generate-slides` message.
async fn read_message(path: &Path) -> Result<Value, String> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

    let value: Value = serde_json::from_slice(&raw)
        .map_err(|e| format!("{} is not valid JSON: {}", path.display(), e))?;

    Ok(match value {
        Value::Array(_) => json!({ "type": "generate-slides", "slides": value }),
        other => other,
    })
}
