//! Classification of upstream outcomes into the error taxonomy

use crate::types::{GeminiErrorBody, GeminiResponse};
use gemgate_core::{Error, FinishReason, GenerationResult, Result};

/// Text returned when the upstream produced an empty completion.
pub const EMPTY_COMPLETION_TEXT: &str = "No content generated.";

const SAFETY_KEYWORDS: [&str; 5] = ["safety", "blocked", "blockreason", "harm", "prohibited"];

const MAX_MESSAGE_CHARS: usize = 300;

/// Map a non-success HTTP status and its body to an error.
pub fn classify_error_status(
    status: u16,
    retry_after_header: Option<&str>,
    body: &str,
    default_retry_after: u64,
) -> Error {
    let parsed = serde_json::from_str::<GeminiErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| shorten(body));

    match status {
        429 => {
            let retry_after_secs = retry_after_header
                .and_then(|v| v.trim().parse::<u64>().ok())
                .or_else(|| parsed.as_ref().and_then(retry_delay_secs))
                .unwrap_or(default_retry_after);
            Error::RateLimited { retry_after_secs }
        }
        401 | 403 => Error::Unauthorized(message),
        400 => {
            if parsed.as_ref().is_some_and(has_invalid_key_reason) {
                return Error::Unauthorized(message);
            }
            if mentions_safety(&safety_haystack(parsed.as_ref(), body)) {
                Error::ContentBlocked(message)
            } else {
                Error::BadRequest(message)
            }
        }
        _ => Error::Upstream { status, message },
    }
}

/// Extract the generation result from a success body.
pub fn extract_result(body: &str) -> Result<GenerationResult> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("invalid JSON body: {}", e)))?;

    let candidates = response.candidates.unwrap_or_default();
    let Some(candidate) = candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::ContentBlocked(format!("prompt blocked: {}", reason)));
        }
        return Err(Error::MalformedResponse("response has no candidates".to_string()));
    };

    let finish_reason = FinishReason::from_upstream(candidate.finish_reason.as_deref());
    if finish_reason.is_blocked() {
        let raw = candidate.finish_reason.unwrap_or_default();
        return Err(Error::ContentBlocked(format!("generation stopped: {}", raw)));
    }

    let content = candidate
        .content
        .ok_or_else(|| Error::MalformedResponse("candidate has no content".to_string()))?;
    let parts = content
        .parts
        .ok_or_else(|| Error::MalformedResponse("candidate content has no parts".to_string()))?;

    let text = if parts.is_empty() {
        String::new()
    } else {
        let texts: Vec<String> = parts.into_iter().filter_map(|p| p.text).collect();
        if texts.is_empty() {
            return Err(Error::MalformedResponse(
                "candidate parts carry no text".to_string(),
            ));
        }
        texts.concat()
    };

    Ok(GenerationResult {
        text: if text.is_empty() {
            EMPTY_COMPLETION_TEXT.to_string()
        } else {
            text
        },
        finish_reason,
        usage: response.usage_metadata,
        safety_ratings: candidate.safety_ratings,
    })
}

fn has_invalid_key_reason(body: &GeminiErrorBody) -> bool {
    body.error
        .details
        .iter()
        .any(|d| d.get("reason").and_then(|r| r.as_str()) == Some("API_KEY_INVALID"))
}

/// Text searched for safety keywords. For a structured error body this is
/// the message with quoted field paths removed (`'safety_settings[0]'`), the
/// status and any detail reasons. Unstructured bodies are searched whole.
fn safety_haystack(parsed: Option<&GeminiErrorBody>, body: &str) -> String {
    let Some(parsed) = parsed else {
        return body.to_string();
    };

    let mut fragments: Vec<&str> = parsed.error.message.split('\'').step_by(2).collect();
    if let Some(status) = &parsed.error.status {
        fragments.push(status);
    }
    fragments.extend(
        parsed
            .error
            .details
            .iter()
            .filter_map(|d| d.get("reason").and_then(|r| r.as_str())),
    );
    fragments.join(" ")
}

/// Whole-word, case-insensitive keyword match. Type names such as
/// `HarmBlockThreshold` are one word and do not match `harm`.
fn mentions_safety(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| SAFETY_KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k)))
}

/// Parse `RetryInfo.retryDelay` (e.g. `"27s"`, `"1.5s"`) rounded up.
fn retry_delay_secs(body: &GeminiErrorBody) -> Option<u64> {
    body.error.details.iter().find_map(|d| {
        let delay = d.get("retryDelay")?.as_str()?;
        let secs: f64 = delay.strip_suffix('s')?.parse().ok()?;
        (secs.is_finite() && secs >= 0.0).then(|| secs.ceil() as u64)
    })
}

fn shorten(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
