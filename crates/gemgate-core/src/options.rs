//! Generation options resolved from loosely typed caller input

use crate::config::GenerationConfig;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Always within `[0.0, 1.0]`.
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_k: u32,
    pub top_p: f32,
}

impl GenerationOptions {
    /// Resolve caller-supplied `temperature` and `maxTokens` against configured
    /// defaults. Values that are missing, non-numeric or non-finite fall back
    /// to the defaults; out-of-range values are clamped.
    pub fn resolve(
        temperature: Option<&Value>,
        max_tokens: Option<&Value>,
        defaults: &GenerationConfig,
    ) -> Self {
        let temperature = temperature
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite())
            .map(|t| t.clamp(0.0, 1.0) as f32)
            .unwrap_or_else(|| defaults.temperature.clamp(0.0, 1.0));

        let cap = defaults.max_output_tokens_cap.max(1);
        let max_output_tokens = max_tokens
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite() && *n >= 1.0)
            .map(|n| (n.floor() as u64).min(cap as u64) as u32)
            .unwrap_or_else(|| defaults.max_output_tokens.clamp(1, cap));

        Self {
            temperature,
            max_output_tokens,
            top_k: defaults.top_k,
            top_p: defaults.top_p,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::resolve(None, None, &GenerationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.temperature, 0.7);
        assert_eq!(opts.max_output_tokens, 1024);
        assert_eq!(opts.top_k, 40);
        assert_eq!(opts.top_p, 0.95);
    }

    #[test]
    fn test_temperature_clamped() {
        let cfg = GenerationConfig::default();
        let hot = GenerationOptions::resolve(Some(&json!(3.5)), None, &cfg);
        assert_eq!(hot.temperature, 1.0);
        let cold = GenerationOptions::resolve(Some(&json!(-1)), None, &cfg);
        assert_eq!(cold.temperature, 0.0);
        let ok = GenerationOptions::resolve(Some(&json!(0.25)), None, &cfg);
        assert_eq!(ok.temperature, 0.25);
    }

    #[test]
    fn test_non_numeric_temperature_uses_default() {
        let cfg = GenerationConfig::default();
        let opts = GenerationOptions::resolve(Some(&json!("warm")), None, &cfg);
        assert_eq!(opts.temperature, cfg.temperature);
    }

    #[test]
    fn test_max_tokens_bounds() {
        let cfg = GenerationConfig::default();
        let capped = GenerationOptions::resolve(None, Some(&json!(1_000_000)), &cfg);
        assert_eq!(capped.max_output_tokens, cfg.max_output_tokens_cap);
        let zero = GenerationOptions::resolve(None, Some(&json!(0)), &cfg);
        assert_eq!(zero.max_output_tokens, cfg.max_output_tokens);
        let negative = GenerationOptions::resolve(None, Some(&json!(-20)), &cfg);
        assert_eq!(negative.max_output_tokens, cfg.max_output_tokens);
        let explicit = GenerationOptions::resolve(None, Some(&json!(256)), &cfg);
        assert_eq!(explicit.max_output_tokens, 256);
    }
}
