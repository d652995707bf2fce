use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use super::{AiError, CompletionClient, ImagePart};
use crate::config::AiConfig;

/// Upper bound for error bodies carried inside `AiError::Status`
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Finish reasons that mean the reply was withheld rather than empty
const BLOCKING_FINISH_REASONS: [&str; 4] = ["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

/// `generateContent` client for the Gemini API.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self, AiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| AiError::Transport(err.to_string()))?;

        // accept both "gemini-1.5-flash" and "models/gemini-1.5-flash"
        let model = config.model.trim().trim_start_matches("models/").to_string();
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            model
        );

        Ok(Self {
            http,
            endpoint,
            api_key,
            model,
            timeout_secs: config.timeout_secs,
        })
    }

    fn request_body(prompt: &str, image: Option<ImagePart<'_>>) -> Value {
        let mut parts = vec![json!({ "text": prompt })];
        if let Some(image) = image {
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": STANDARD.encode(image.data),
                }
            }));
        }

        json!({
            "contents": [{ "role": "user", "parts": parts }]
        })
    }

    /// Pull the reply text out of a `generateContent` response.
    fn extract_text(resp: &Value) -> Result<String, AiError> {
        if let Some(reason) = resp
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
        {
            return Err(AiError::Blocked(reason.to_string()));
        }

        let candidate = resp
            .pointer("/candidates/0")
            .ok_or(AiError::EmptyResponse)?;

        let text = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            if let Some(reason) = candidate
                .get("finishReason")
                .and_then(Value::as_str)
                .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
            {
                return Err(AiError::Blocked(reason.to_string()));
            }
        }

        Ok(text)
    }

    fn transport_error(&self, err: reqwest::Error) -> AiError {
        if err.is_timeout() {
            AiError::Timeout(self.timeout_secs)
        } else {
            AiError::Transport(err.to_string())
        }
    }
}

impl CompletionClient for GeminiClient {
    fn complete(&self, prompt: &str, image: Option<ImagePart<'_>>) -> Result<String, AiError> {
        let now = Instant::now();
        let body = Self::request_body(prompt, image);

        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|err| self.transport_error(err))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let value: Value = resp.json().map_err(|err| {
            if err.is_timeout() {
                AiError::Timeout(self.timeout_secs)
            } else {
                AiError::Decode(err.to_string())
            }
        })?;

        let text = Self::extract_text(&value)?;

        log::debug!(
            "model={} image={} took={}ms reply_chars={}",
            self.model,
            image.is_some(),
            now.elapsed().as_millis(),
            text.chars().count()
        );

        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
