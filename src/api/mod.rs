//! Wire payloads exchanged with the backend.
//!
//! The backend speaks JSON over HTTP: a model catalog endpoint, and a message
//! endpoint that answers with a server-sent event stream of response
//! fragments.

use serde::{Deserialize, Serialize};

/// One prior conversation turn carried in the outbound envelope.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// Envelope for a single outbound user message.
#[derive(Serialize, Debug)]
pub struct OutboundMessage {
    pub text: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    pub history: Vec<HistoryMessage>,
}

/// One streamed response fragment, delivered as an SSE `data:` payload.
#[derive(Deserialize)]
pub struct StreamChunk {
    pub text: String,
}

/// Response to the model catalog request.
#[derive(Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_absent_image() {
        let envelope = OutboundMessage {
            text: "hi".to_string(),
            model: "m1".to_string(),
            image_base64: None,
            history: Vec::new(),
        };
        let json = serde_json::to_string(&envelope).expect("serialize envelope");
        assert!(!json.contains("image_base64"));
        assert!(json.contains("\"history\":[]"));
    }

    #[test]
    fn envelope_carries_image_when_present() {
        let envelope = OutboundMessage {
            text: "look".to_string(),
            model: "m1".to_string(),
            image_base64: Some("aGVsbG8=".to_string()),
            history: vec![HistoryMessage {
                role: "user".to_string(),
                content: "earlier".to_string(),
            }],
        };
        let json = serde_json::to_string(&envelope).expect("serialize envelope");
        assert!(json.contains("\"image_base64\":\"aGVsbG8=\""));
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn models_response_parses() {
        let parsed: ModelsResponse =
            serde_json::from_str(r#"{"models":["m1","m2"]}"#).expect("parse catalog");
        assert_eq!(parsed.models, vec!["m1", "m2"]);
    }
}
