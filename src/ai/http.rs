//! `generateContent` client for a Gemini-style REST endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AiError, MediaPart, ModelProvider, ModelReply, ModelRequest, ResponseFormat};
use crate::config::AiConfig;

const HARM_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

pub struct HttpModelProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpModelProvider {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AiError::NotConfigured)?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Request body for one `generateContent` call
pub(crate) fn request_body(request: &ModelRequest) -> Value {
    let mut parts = vec![json!({ "text": request.prompt })];
    if let Some(media) = &request.media {
        parts.push(json!({
            "inlineData": { "mimeType": media.mime_type, "data": media.data }
        }));
    }

    let generation_config = match &request.format {
        ResponseFormat::Json(schema) => json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        }),
        ResponseFormat::Image => json!({ "responseModalities": ["TEXT", "IMAGE"] }),
    };

    let safety_settings: Vec<Value> = HARM_CATEGORIES
        .iter()
        .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
        .collect();

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config,
        "safetySettings": safety_settings,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

fn into_reply(response: GenerateResponse) -> Result<ModelReply, AiError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AiError::Blocked(reason));
    }

    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut reply = ModelReply::default();
    for part in parts {
        if let Some(text) = part.text {
            reply.text.push_str(&text);
        }
        if let Some(inline) = part.inline_data {
            reply.media.push(MediaPart {
                mime_type: inline.mime_type,
                data: inline.data,
            });
        }
    }
    Ok(reply)
}

#[async_trait]
impl ModelProvider for HttpModelProvider {
    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, AiError> {
        log::debug!("sending generateContent request to model {}", self.model);
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&request))
            .send()
            .await
            .map_err(|e| AiError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::ResponseParsing(e.to_string()))?;
        into_reply(parsed)
    }
}
