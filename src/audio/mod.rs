pub mod extract;
pub mod probe;
pub mod segment;

pub use extract::{ChunkExtractor, FfmpegExtractor};
pub use probe::{check_ffmpeg, check_ffprobe, probe_audio_file};
pub use segment::segment;

use std::path::PathBuf;
use std::time::Duration;

/// Audio formats accepted from the input folder.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg"];

/// An input file after probing. Immutable for the rest of the run.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: PathBuf,
    pub duration: Duration,
    pub size_bytes: u64,
}

impl AudioFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercased extension, used to name extracted chunks so codec-copy
    /// extraction keeps the container format.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "mp3".to_string())
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn needs_splitting(&self, max_file_size_mb: u64) -> bool {
        self.size_mb() > max_file_size_mb as f64
    }
}

/// One planned slice of an audio file. Produced by the segmenter, consumed
/// by the extractor, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpec {
    /// 0-based position; defines output ordering.
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    /// How much of this chunk repeats the tail of the previous one.
    pub overlap: Duration,
}

impl ChunkSpec {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}
