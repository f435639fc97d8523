pub type FlipbookResult<T> = Result<T, FlipbookError>;

#[derive(thiserror::Error, Debug)]
pub enum FlipbookError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("encoder produced an empty artifact")]
    EmptyArtifact,

    #[error("an export is already in progress")]
    Busy,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlipbookError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encoder_unavailable(msg: impl Into<String>) -> Self {
        Self::EncoderUnavailable(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
