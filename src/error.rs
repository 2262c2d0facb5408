use thiserror::Error;

#[derive(Error, Debug)]
pub enum HearscribeError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cannot probe {path}: {detail}")]
    UnreadableFile { path: String, detail: String },

    #[error("Chunk extraction failed: {0}")]
    Extraction(String),

    #[error("Transcription service unavailable after {attempts} attempts: {detail}")]
    TransientService { attempts: u32, detail: String },

    #[error("Transcription request rejected: {0}")]
    PermanentService(String),

    #[error("API quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HearscribeError>;
