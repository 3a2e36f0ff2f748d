use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the ASR engine.
///
/// Everything that can go wrong maps onto one of these four kinds; model
/// failures carry the name of the pipeline stage that produced them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("ASR engine is not initialized")]
    NotInitialized,

    #[error("invalid audio data: {0}")]
    InvalidAudioData(String),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("processing failed at stage `{stage}`: {message}")]
    ProcessingFailed {
        stage: &'static str,
        message: String,
    },
}

impl Error {
    pub(crate) fn processing(stage: &'static str, message: impl Into<String>) -> Self {
        Error::ProcessingFailed {
            stage,
            message: message.into(),
        }
    }

    /// Name of the failing pipeline stage, for `ProcessingFailed` errors.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Error::ProcessingFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
