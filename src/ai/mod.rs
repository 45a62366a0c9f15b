//! Wrappers around a hosted generative model.
//!
//! Every flow is one request: a fixed prompt, the caller's text and at most
//! one media attachment, plus the JSON shape the answer must have. Replies
//! are classified into [`FlowOutcome`]; nothing is retried.

pub mod flows;
#[cfg(feature = "web")]
pub mod http;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use flows::AiFlow;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("AI provider is not configured (missing API key)")]
    NotConfigured,

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("AI provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not parse provider response: {0}")]
    ResponseParsing(String),

    #[error("request blocked by the provider: {0}")]
    Blocked(String),
}

/// Error surfaced to callers once an outcome is turned into a `Result`
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("AI did not return expected output")]
    SchemaMismatch { raw: String },

    #[error(transparent)]
    Provider(#[from] AiError),
}

/// Inline media sent to or received from the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    pub mime_type: String,
    /// Base64 payload, without the `data:` prefix
    pub data: String,
}

impl MediaPart {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Parse `data:<mime>;base64,<payload>`, checking that the payload decodes
pub fn parse_data_uri(uri: &str) -> Result<MediaPart, AiError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| AiError::InvalidDataUri("missing data: prefix".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| AiError::InvalidDataUri("missing payload".to_string()))?;
    let mime_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| AiError::InvalidDataUri("payload must be base64".to_string()))?;

    if mime_type.is_empty() || !mime_type.contains('/') {
        return Err(AiError::InvalidDataUri(format!("bad MIME type {mime_type:?}")));
    }
    if payload.is_empty() {
        return Err(AiError::InvalidDataUri("empty payload".to_string()));
    }
    BASE64
        .decode(payload)
        .map_err(|e| AiError::InvalidDataUri(e.to_string()))?;

    Ok(MediaPart {
        mime_type: mime_type.to_string(),
        data: payload.to_string(),
    })
}

/// What the model is asked to produce
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// A JSON object matching this schema
    Json(Value),
    /// An image, with optional text alongside
    Image,
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    pub media: Option<MediaPart>,
    pub format: ResponseFormat,
}

#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: String,
    pub media: Vec<MediaPart>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media: Vec::new(),
        }
    }
}

/// A hosted model that answers one request at a time
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, AiError>;
}

/// An output shape a flow can validate
pub trait FlowOutput: DeserializeOwned + Serialize {
    /// False when required fields parsed but hold nothing usable
    fn is_complete(&self) -> bool {
        true
    }
}

/// Result of one flow call
#[derive(Debug)]
pub enum FlowOutcome<T> {
    Ok(T),
    /// The model answered, but not in the declared shape
    SchemaMismatch(String),
    ProviderError(AiError),
}

// Models sometimes wrap JSON in a markdown fence
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

impl<T: FlowOutput> FlowOutcome<T> {
    /// Classify a raw provider reply against the output shape `T`
    pub fn from_reply(reply: Result<ModelReply, AiError>) -> Self {
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("AI provider error: {e}");
                return FlowOutcome::ProviderError(e);
            }
        };

        match serde_json::from_str::<T>(strip_code_fence(&reply.text)) {
            Ok(value) if value.is_complete() => FlowOutcome::Ok(value),
            Ok(_) => {
                log::warn!("AI reply is missing required content");
                FlowOutcome::SchemaMismatch(reply.text)
            }
            Err(e) => {
                log::warn!("AI reply does not match the expected schema: {e}");
                FlowOutcome::SchemaMismatch(reply.text)
            }
        }
    }
}

impl<T> FlowOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, FlowOutcome::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            FlowOutcome::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FlowOutcome<U> {
        match self {
            FlowOutcome::Ok(value) => FlowOutcome::Ok(f(value)),
            FlowOutcome::SchemaMismatch(raw) => FlowOutcome::SchemaMismatch(raw),
            FlowOutcome::ProviderError(e) => FlowOutcome::ProviderError(e),
        }
    }

    /// The value, or `fallback` for either failure
    pub fn or_fallback(self, fallback: T) -> T {
        self.ok().unwrap_or(fallback)
    }

    pub fn into_result(self) -> Result<T, FlowError> {
        match self {
            FlowOutcome::Ok(value) => Ok(value),
            FlowOutcome::SchemaMismatch(raw) => Err(FlowError::SchemaMismatch { raw }),
            FlowOutcome::ProviderError(e) => Err(FlowError::Provider(e)),
        }
    }
}

/// Gemini-style response schema for an object whose fields are all required
pub(crate) fn object_schema(fields: &[(&str, Value)]) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(name, schema)| (name.to_string(), schema.clone()))
        .collect();
    let required: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    serde_json::json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

pub(crate) fn string_schema() -> Value {
    serde_json::json!({ "type": "STRING" })
}

pub(crate) fn string_list_schema() -> Value {
    serde_json::json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_round_trips() {
        let media = parse_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.to_data_uri(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn bad_data_uris_are_rejected() {
        for uri in [
            "image/png;base64,aGVsbG8=",
            "data:image/png,aGVsbG8=",
            "data:;base64,aGVsbG8=",
            "data:image/png;base64,",
            "data:image/png;base64,@@@",
        ] {
            assert!(
                matches!(parse_data_uri(uri), Err(AiError::InvalidDataUri(_))),
                "{uri} should be rejected"
            );
        }
    }

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }
}
