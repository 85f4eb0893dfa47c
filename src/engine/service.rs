use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::queue::{CoalescingQueue, Submission};
use super::reconciler::{Reconciler, RunReport};
use crate::error::{ReconcileError, ServiceError};
use crate::host::Host;
use crate::model::{InboundMessage, OutboundMessage, SlideDocument};
use crate::payload::PayloadValidator;
use crate::render::NodeRenderer;

type RunQueue = CoalescingQueue<Vec<SlideDocument>, Result<RunReport, ReconcileError>>;

/// Message-level entry point: validate, queue, reconcile, reply.
///
/// Submissions go through a latest-wins queue, so a burst of edits collapses
/// into at most one run in progress plus one run for the newest payload.
pub struct SlideService<H, R> {
    validator: PayloadValidator,
    reconciler: Arc<Reconciler<H, R>>,
    queue: RunQueue,
}

impl<H, R> SlideService<H, R>
where
    H: Host + 'static,
    R: NodeRenderer + 'static,
{
    pub fn new(validator: PayloadValidator, reconciler: Arc<Reconciler<H, R>>) -> Self {
        let engine = reconciler.clone();
        let queue = CoalescingQueue::new(move |slides: Vec<SlideDocument>| {
            let engine = engine.clone();
            async move { engine.run(&slides).await }
        });

        Self {
            validator,
            reconciler,
            queue,
        }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler<H, R>> {
        &self.reconciler
    }

    pub fn validator(&self) -> &PayloadValidator {
        &self.validator
    }

    /// Handle one raw inbound message and produce the reply.
    pub async fn handle(&self, raw: Value) -> OutboundMessage {
        match self.submit(raw).await {
            Ok(Submission::Completed(report)) => OutboundMessage::Success {
                count: report.count,
            },
            Ok(Submission::Superseded) => OutboundMessage::Superseded,
            Err(e) => OutboundMessage::error(e.to_string()),
        }
    }

    /// Parse, validate and reconcile one raw inbound message.
    pub async fn submit(&self, raw: Value) -> Result<Submission<RunReport>, ServiceError> {
        let message = InboundMessage::from_value(raw).map_err(|e| {
            warn!("Rejected message: {}", e);
            e
        })?;

        let InboundMessage::GenerateSlides { slides } = message;
        self.generate(&slides).await
    }

    /// Validate a raw slide list and reconcile it.
    pub async fn generate(&self, slides: &Value) -> Result<Submission<RunReport>, ServiceError> {
        let payload = self.validator.validate(slides).map_err(|e| {
            warn!("Rejected payload: {}", e);
            e
        })?;

        let count = payload.slides.len();
        match self.queue.submit(payload.slides).outcome().await? {
            Submission::Completed(result) => {
                let report = result?;
                info!(count = report.count, "Slides generated");
                Ok(Submission::Completed(report))
            }
            Submission::Superseded => {
                info!(count, "Submission superseded by a newer one");
                Ok(Submission::Superseded)
            }
        }
    }
}
