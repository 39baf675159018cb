//! Span attribute names, following the OpenTelemetry gen_ai conventions

pub const SYSTEM_NAME: &str = "gemini";

pub const GEN_AI_SYSTEM: &str = "gen_ai.system";
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";
pub const GEN_AI_RESPONSE_FINISH_REASON: &str = "gen_ai.response.finish_reasons";

pub const GEMGATE_MESSAGE_COUNT: &str = "gemgate.request.message_count";
pub const GEMGATE_HAS_SYSTEM_INSTRUCTION: &str = "gemgate.request.has_system_instruction";
pub const GEMGATE_ERROR_CODE: &str = "gemgate.error.code";
