use crate::pipeline::TagError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("file not found")]
    NotFound,

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("AI service is not configured")]
    AiUnavailable,

    #[error("{0}")]
    Tagging(#[from] TagError),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("Base64: {0:?}")]
    Base64(#[from] base64::DecodeError),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
