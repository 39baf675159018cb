use gemgate_core::{FinishReason, GenerationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound chat body. Fields stay loosely typed so that the normalizer can
/// default malformed values instead of the extractor rejecting them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "messages")]
    pub history: Option<Value>,
    #[serde(default, alias = "message")]
    pub prompt: Option<Value>,
    #[serde(
        default,
        rename = "systemInstruction",
        alias = "system_instruction",
        alias = "system"
    )]
    pub system_instruction: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(
        default,
        rename = "maxTokens",
        alias = "max_tokens",
        alias = "maxOutputTokens"
    )]
    pub max_tokens: Option<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_ratings: Option<Vec<Value>>,
}

impl ChatResponse {
    pub fn from_result(result: GenerationResult, include_metadata: bool) -> Self {
        if include_metadata {
            Self {
                text: result.text,
                finish_reason: Some(result.finish_reason),
                usage: result.usage,
                safety_ratings: Some(result.safety_ratings),
            }
        } else {
            Self {
                text: result.text,
                finish_reason: None,
                usage: None,
                safety_ratings: None,
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_aliases() {
        let req: ChatRequest = serde_json::from_value(json!({
            "messages": [],
            "message": "hi",
            "system": "be brief",
            "max_tokens": 10
        }))
        .unwrap();
        assert_eq!(req.history, Some(json!([])));
        assert_eq!(req.prompt, Some(json!("hi")));
        assert_eq!(req.system_instruction, Some(json!("be brief")));
        assert_eq!(req.max_tokens, Some(json!(10)));

        let req: ChatRequest = serde_json::from_value(json!({
            "prompt": "hi",
            "systemInstruction": {"parts": [{"text": "x"}]},
            "maxTokens": 5,
            "temperature": "hot"
        }))
        .unwrap();
        assert!(req.system_instruction.unwrap().is_object());
        assert_eq!(req.temperature, Some(json!("hot")));
    }

    #[test]
    fn test_response_metadata_toggle() {
        let result = GenerationResult {
            text: "hi".to_string(),
            finish_reason: FinishReason::Stop,
            usage: Some(json!({"totalTokenCount": 3})),
            safety_ratings: vec![],
        };

        let plain = serde_json::to_value(ChatResponse::from_result(result.clone(), false)).unwrap();
        assert_eq!(plain, json!({"text": "hi"}));

        let rich = serde_json::to_value(ChatResponse::from_result(result, true)).unwrap();
        assert_eq!(rich["finishReason"], "STOP");
        assert_eq!(rich["usage"]["totalTokenCount"], 3);
        assert_eq!(rich["safetyRatings"], json!([]));
    }
}
