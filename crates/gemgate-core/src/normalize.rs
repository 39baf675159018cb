//! Request normalization
//!
//! Turns the loosely typed conversation a client sends into the canonical
//! message list and system instruction expected upstream. Structural problems
//! in the history are defaulted rather than rejected; only an unusable prompt
//! fails.
//!
//! Sanitization strips `< > { } [ ]`. This is lossy: code snippets or JSON
//! pasted into a prompt lose their brackets.

use crate::config::NormalizerConfig;
use crate::{Error, Message, Part, Result, Role};
use serde_json::Value;

const STRIPPED_CHARS: [char; 6] = ['<', '>', '{', '}', '[', ']'];

/// Output of [`Normalizer::normalize`]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedConversation {
    /// Sanitized history in original order, followed by exactly one user
    /// message carrying the prompt.
    pub messages: Vec<Message>,
    pub system_instruction: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    max_text_chars: usize,
    drop_empty_turns: bool,
}

enum Coerced {
    Turn(Message),
    System(String),
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            max_text_chars: config.max_text_chars,
            drop_empty_turns: config.drop_empty_turns,
        }
    }

    pub fn sanitize(&self, text: &str) -> String {
        sanitize(text, self.max_text_chars)
    }

    pub fn normalize(
        &self,
        raw_history: Option<&Value>,
        raw_prompt: Option<&Value>,
        raw_system: Option<&Value>,
    ) -> Result<NormalizedConversation> {
        let prompt = self.normalize_prompt(raw_prompt)?;

        let mut system_fragments: Vec<String> = raw_system
            .and_then(|value| self.system_text(value))
            .into_iter()
            .collect();

        let entries = raw_history
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut messages = Vec::with_capacity(entries.len() + 1);
        for entry in entries {
            match self.coerce_entry(entry) {
                Coerced::System(text) => {
                    if !text.is_empty() {
                        system_fragments.push(text);
                    }
                }
                Coerced::Turn(message) => {
                    if self.drop_empty_turns && message.is_blank() {
                        tracing::debug!("Dropping history turn with empty text");
                        continue;
                    }
                    messages.push(message);
                }
            }
        }

        messages.push(Message::new_user_text(prompt));

        let system_instruction = if system_fragments.is_empty() {
            None
        } else {
            Some(self.sanitize(&system_fragments.join(" "))).filter(|s| !s.is_empty())
        };

        Ok(NormalizedConversation {
            messages,
            system_instruction,
        })
    }

    fn normalize_prompt(&self, raw_prompt: Option<&Value>) -> Result<String> {
        let prompt = match raw_prompt {
            None | Some(Value::Null) => return Err(Error::validation("prompt is required")),
            Some(Value::String(s)) => s,
            Some(_) => return Err(Error::validation("prompt must be a string")),
        };

        if prompt.trim().is_empty() {
            return Err(Error::validation("prompt must not be empty"));
        }

        let sanitized = self.sanitize(prompt);
        if sanitized.is_empty() {
            return Err(Error::validation("prompt is empty after sanitization"));
        }
        Ok(sanitized)
    }

    /// Coerce one history element. Never fails: anything unrecognised is
    /// defaulted to a user turn with a single empty part.
    fn coerce_entry(&self, entry: &Value) -> Coerced {
        let role = entry.get("role").and_then(Value::as_str).map(|r| r.trim().to_ascii_lowercase());

        let parts = self.coerce_parts(entry);

        match role.as_deref() {
            Some("system") => {
                let text = parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                Coerced::System(text)
            }
            Some("assistant") | Some("model") | Some("bot") | Some("ai") => {
                Coerced::Turn(Message {
                    role: Role::Model,
                    parts,
                })
            }
            _ => Coerced::Turn(Message {
                role: Role::User,
                parts,
            }),
        }
    }

    fn coerce_parts(&self, entry: &Value) -> Vec<Part> {
        if let Some(parts) = entry.get("parts").and_then(Value::as_array) {
            let parts: Vec<Part> = parts
                .iter()
                .map(|part| {
                    let text = part.get("text").and_then(Value::as_str).unwrap_or_default();
                    Part::text(self.sanitize(text))
                })
                .collect();
            if !parts.is_empty() {
                return parts;
            }
            return vec![Part::text("")];
        }

        let flat = entry
            .get("text")
            .and_then(Value::as_str)
            .or_else(|| entry.get("content").and_then(Value::as_str));

        vec![Part::text(flat.map(|t| self.sanitize(t)).unwrap_or_default())]
    }

    fn system_text(&self, value: &Value) -> Option<String> {
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Object(_) => {
                if let Some(parts) = value.get("parts").and_then(Value::as_array) {
                    parts
                        .iter()
                        .filter_map(|p| p.get("text").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join(" ")
                } else {
                    value.get("text").and_then(Value::as_str)?.to_string()
                }
            }
            _ => return None,
        };

        Some(self.sanitize(&raw)).filter(|s| !s.is_empty())
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

/// Normalize with default settings.
pub fn normalize(
    raw_history: Option<&Value>,
    raw_prompt: Option<&Value>,
    raw_system: Option<&Value>,
) -> Result<NormalizedConversation> {
    Normalizer::default().normalize(raw_history, raw_prompt, raw_system)
}

/// Sanitize a free-text fragment.
///
/// Strips `< > { } [ ]`, collapses whitespace runs to a single space, trims,
/// and keeps at most `max_chars` characters. Work stops as soon as the bound
/// is reached. The result never ends with whitespace, so the function is
/// idempotent.
pub fn sanitize(text: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(text.len().min(max_chars));
    let mut count = 0usize;
    let mut pending_space = false;

    for c in text.chars() {
        if STRIPPED_CHARS.contains(&c) {
            continue;
        }
        if c.is_whitespace() {
            pending_space = count > 0;
            continue;
        }

        let needed = if pending_space { 2 } else { 1 };
        if count + needed > max_chars {
            break;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
        count += needed;
    }

    out
}
