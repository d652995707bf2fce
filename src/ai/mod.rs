//! Client side of the external generative model.
//!
//! Everything the pipeline knows about the model is the [`CompletionClient`]
//! contract: a text prompt, optionally with one attached image, yields a text
//! reply or an [`AiError`]. Replies are not assumed to be deterministic.

mod gemini;

pub use gemini::GeminiClient;

use crate::config::AiConfig;

/// Errors produced by a completion call or by client construction.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("no API key configured (set ai.api_key or {})", crate::config::API_KEY_ENV)]
    MissingCredential,

    #[error("AI request timed out after {0} seconds")]
    Timeout(u64),

    #[error("AI transport error: {0}")]
    Transport(String),

    #[error("AI service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI service blocked the prompt: {0}")]
    Blocked(String),

    #[error("AI service returned no text")]
    EmptyResponse,

    #[error("could not decode AI response: {0}")]
    Decode(String),
}

/// An image attached to a prompt.
#[derive(Debug, Clone, Copy)]
pub struct ImagePart<'a> {
    pub mime_type: &'a str,
    pub data: &'a [u8],
}

/// Text(+image)-in, text-out completion service.
///
/// Implementations are shared read-only between concurrent requests.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str, image: Option<ImagePart<'_>>) -> Result<String, AiError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Build the process-wide client from configuration.
///
/// Fails at startup when the credential is missing, instead of handing out a
/// client that errors on every call.
pub fn connect(config: &AiConfig) -> Result<GeminiClient, AiError> {
    let api_key = config.resolve_api_key().ok_or(AiError::MissingCredential)?;
    let client = GeminiClient::new(config, api_key)?;
    log::info!("ai client ready model={}", client.model());
    Ok(client)
}
