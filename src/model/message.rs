//! Messages exchanged with the authoring side.
//!
//! The inbound message keeps its `slides` as raw JSON: it is untrusted and must
//! pass the payload validator before anything is deserialized into slide
//! documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessageError;

/// Message received from the authoring tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundMessage {
    GenerateSlides {
        #[serde(default)]
        slides: Value,
    },
}

impl InboundMessage {
    /// Parse an untrusted JSON value into a message.
    pub fn from_value(raw: Value) -> Result<Self, MessageError> {
        let message_type = raw
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| MessageError::Invalid("missing message type".to_string()))?;

        if message_type != "generate-slides" {
            return Err(MessageError::UnsupportedType(message_type));
        }

        serde_json::from_value(raw).map_err(|e| MessageError::Invalid(e.to_string()))
    }
}

/// Message returned to the authoring tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    /// The run finished without failing
    Success { count: usize },

    /// Validation failed or the run failed
    Error { message: String },

    /// A newer submission replaced this one before it ran
    Superseded,
}

impl OutboundMessage {
    pub fn error(message: impl Into<String>) -> Self {
        OutboundMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_generate_slides() {
        let msg = InboundMessage::from_value(json!({
            "type": "generate-slides",
            "slides": [{"blocks": []}]
        }))
        .unwrap();

        let InboundMessage::GenerateSlides { slides } = msg;
        assert!(slides.is_array());
    }

    #[test]
    fn test_unsupported_type() {
        let err = InboundMessage::from_value(json!({"type": "close"})).unwrap_err();
        assert_eq!(err, MessageError::UnsupportedType("close".to_string()));
    }

    #[test]
    fn test_missing_type() {
        let err = InboundMessage::from_value(json!({"slides": []})).unwrap_err();
        assert!(matches!(err, MessageError::Invalid(_)));
    }

    #[test]
    fn test_outbound_wire_shape() {
        let success = serde_json::to_value(OutboundMessage::Success { count: 1 }).unwrap();
        assert_eq!(success, json!({"type": "success", "count": 1}));

        let error = serde_json::to_value(OutboundMessage::error("boom")).unwrap();
        assert_eq!(error, json!({"type": "error", "message": "boom"}));
    }
}
