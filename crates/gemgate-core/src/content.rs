use serde::{Deserialize, Serialize};

/// Conversation role accepted by the upstream protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Message represents one conversation turn with one or more text parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn new_user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn new_model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// True when every part carries empty text.
    pub fn is_blank(&self) -> bool {
        self.parts.iter().all(|p| p.text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Why the upstream stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    Stop,
    Safety,
    Recitation,
    Other,
}

impl FinishReason {
    /// Map the upstream's raw finish reason string.
    pub fn from_upstream(raw: Option<&str>) -> Self {
        match raw {
            Some("STOP") => FinishReason::Stop,
            Some("SAFETY") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") | Some("SPII") => {
                FinishReason::Safety
            }
            Some("RECITATION") => FinishReason::Recitation,
            _ => FinishReason::Other,
        }
    }

    pub fn is_blocked(self) -> bool {
        matches!(self, FinishReason::Safety | FinishReason::Recitation)
    }
}

/// Result of one successful upstream generation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub text: String,
    pub finish_reason: FinishReason,
    /// Token accounting as reported upstream, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
    pub safety_ratings: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serializes_lowercase_role() {
        let msg = Message::new_model_text("hi");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"role": "model", "parts": [{"text": "hi"}]})
        );
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_upstream(Some("STOP")), FinishReason::Stop);
        assert_eq!(FinishReason::from_upstream(Some("SAFETY")), FinishReason::Safety);
        assert_eq!(FinishReason::from_upstream(Some("SPII")), FinishReason::Safety);
        assert_eq!(
            FinishReason::from_upstream(Some("RECITATION")),
            FinishReason::Recitation
        );
        assert_eq!(
            FinishReason::from_upstream(Some("MAX_TOKENS")),
            FinishReason::Other
        );
        assert_eq!(FinishReason::from_upstream(None), FinishReason::Other);
        assert!(FinishReason::Recitation.is_blocked());
        assert!(!FinishReason::Other.is_blocked());
    }

    #[test]
    fn test_is_blank() {
        let msg = Message {
            role: Role::User,
            parts: vec![Part::text(""), Part::text("")],
        };
        assert!(msg.is_blank());
        assert!(!Message::new_user_text("x").is_blank());
    }
}
