use std::io;

use teloxide::dispatching::dialogue::InMemStorageError;
use thiserror::Error;

pub type QuizResult<T> = Result<T, QuizError>;

/// Everything that can stop a quiz between the uploaded document and the last poll.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("could not read PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("document download failed: {0}")]
    Download(#[from] teloxide::DownloadError),

    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned HTTP {status}: {message}")]
    Model { status: u16, message: String },

    #[error("model response contains no JSON array")]
    NoJsonArray,

    #[error("model response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("question #{index} is malformed: {reason}")]
    MalformedQuestion { index: usize, reason: String },

    #[error("model returned no questions")]
    NoQuestions,

    #[error("document has no extractable text")]
    EmptyDocument,

    #[error("session storage failed: {0}")]
    Session(#[from] InMemStorageError),

    #[error("text extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl QuizError {
    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedQuestion {
            index,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} should be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}
