use thiserror::Error;

/// Which resource cache a host handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Font,
    Style,
    Image,
    Node,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Font => "font",
            ResourceKind::Style => "style",
            ResourceKind::Image => "image",
            ResourceKind::Node => "node",
        };
        f.write_str(name)
    }
}

/// Whole-payload rejection. Nothing is rendered when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The `slides` value is not a JSON array
    #[error("Payload must be a list of slides")]
    NotAList,

    /// The slide list is empty
    #[error("Payload contains no slides")]
    Empty,

    /// Too many slides in one payload
    #[error("Too many slides: {count} (maximum is {max})")]
    TooManySlides { count: usize, max: usize },

    /// One slide carries too many content blocks
    #[error("Slide {index} has {count} blocks (maximum is {max})")]
    TooManyBlocks {
        index: usize,
        count: usize,
        max: usize,
    },

    /// A slide does not have the shape of a slide document
    #[error("Slide {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },
}

/// Errors reported by the rendering host primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// A previously issued handle is no longer valid on the host
    #[error("Stale {kind} reference: {id}")]
    StaleReference { kind: ResourceKind, id: String },

    /// Node does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Font could not be loaded
    #[error("Font unavailable: {0}")]
    FontUnavailable(String),

    /// Image bytes were rejected or could not be fetched
    #[error("Image unavailable: {0}")]
    ImageUnavailable(String),

    /// Library style could not be imported
    #[error("Style unavailable: {0}")]
    StyleUnavailable(String),

    /// Any other host failure
    #[error("Host error: {0}")]
    Other(String),
}

impl HostError {
    /// The cache that must be invalidated when this error is observed, if any.
    pub fn stale_kind(&self) -> Option<ResourceKind> {
        match self {
            HostError::StaleReference { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Per-key resource resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The host failed to resolve this key
    #[error("Failed to resolve {kind} '{key}': {reason}")]
    Unresolved {
        kind: ResourceKind,
        key: String,
        reason: String,
    },

    /// A previous failure for this key is memoized
    #[error("{kind} '{key}' previously failed: {reason}")]
    Memoized {
        kind: ResourceKind,
        key: String,
        reason: String,
    },
}

/// Failure while building the content of one slide.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The host rejected a mutation
    #[error(transparent)]
    Host(#[from] HostError),

    /// A block could not be turned into a node
    #[error("Failed to render {kind} block: {message}")]
    Block { kind: &'static str, message: String },
}

/// Run-level failure returned to the caller of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Tagged nodes could not be enumerated; nothing was touched
    #[error("Failed to discover existing slides: {0}")]
    Discovery(HostError),

    /// A slide failed to render; other slides were still processed
    #[error("Slide {index} failed: {source}")]
    Slide {
        index: usize,
        #[source]
        source: RenderError,
    },

    /// A stale node could not be destroyed
    #[error("Failed to prune slide node {node_id}: {source}")]
    Prune {
        node_id: String,
        #[source]
        source: HostError,
    },
}

/// A queued submission was dropped without producing an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Run aborted before producing a result")]
    Aborted,
}

/// An inbound message could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("Invalid message: {0}")]
    Invalid(String),

    #[error("Unsupported message type: {0}")]
    UnsupportedType(String),
}

/// Why a submitted message did not produce a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Run(#[from] ReconcileError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl ServiceError {
    /// Whether the caller sent something unacceptable, as opposed to the run
    /// failing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ServiceError::Message(_) | ServiceError::Validation(_))
    }
}
