pub mod policy;
pub mod whisper;

pub use whisper::WhisperClient;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Outcome of one chunk's transcription. Terminal once recorded: retries
/// happen inside the adapter, before a result exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkResult {
    Success { index: usize, text: String },
    Failed { index: usize, error: String },
}

impl ChunkResult {
    pub fn index(&self) -> usize {
        match self {
            ChunkResult::Success { index, .. } | ChunkResult::Failed { index, .. } => *index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChunkResult::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ChunkResult::Success { text, .. } => Some(text),
            ChunkResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ChunkResult::Failed { error, .. } => Some(error),
            ChunkResult::Success { .. } => None,
        }
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio file and return the raw transcript text exactly
    /// as the service produced it.
    async fn transcribe_file(&self, audio: &Path) -> Result<String>;

    fn name(&self) -> &'static str;

    fn max_file_size(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_result_accessors() {
        let ok = ChunkResult::Success {
            index: 2,
            text: "hola".to_string(),
        };
        assert_eq!(ok.index(), 2);
        assert!(ok.is_success());
        assert_eq!(ok.text(), Some("hola"));
        assert_eq!(ok.error(), None);

        let failed = ChunkResult::Failed {
            index: 3,
            error: "timeout".to_string(),
        };
        assert_eq!(failed.index(), 3);
        assert!(!failed.is_success());
        assert_eq!(failed.text(), None);
        assert_eq!(failed.error(), Some("timeout"));
    }
}
