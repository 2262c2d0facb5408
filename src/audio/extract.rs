use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{HearscribeError, Result};

use super::ChunkSpec;

/// Produces a standalone audio segment file for one chunk. The caller owns
/// deleting the produced file.
#[async_trait]
pub trait ChunkExtractor: Send + Sync {
    async fn extract(&self, source: &Path, spec: &ChunkSpec, dest: &Path) -> Result<()>;
}

/// Extracts segments with ffmpeg in codec-copy mode: no re-encoding, so the
/// chunk keeps the source's codec and container and extraction stays fast
/// even on multi-hour recordings.
pub struct FfmpegExtractor;

#[async_trait]
impl ChunkExtractor for FfmpegExtractor {
    async fn extract(&self, source: &Path, spec: &ChunkSpec, dest: &Path) -> Result<()> {
        if !source.exists() {
            return Err(HearscribeError::Extraction(format!(
                "Source file not found: {}",
                source.display()
            )));
        }

        let duration = spec.duration();
        if duration.is_zero() {
            return Err(HearscribeError::Extraction(format!(
                "Chunk {} has zero duration",
                spec.index
            )));
        }

        let start_secs = format!("{:.3}", spec.start.as_secs_f64());
        let duration_secs = format!("{:.3}", duration.as_secs_f64());

        debug!(
            "Extracting chunk {}: start={}s duration={}s -> {}",
            spec.index,
            start_secs,
            duration_secs,
            dest.display()
        );

        let output = Command::new("ffmpeg")
            .args(["-y", "-ss"])
            .arg(&start_secs)
            .arg("-t")
            .arg(&duration_secs)
            .arg("-i")
            .arg(source)
            .args(["-c", "copy"])
            .arg(dest)
            .output()
            .map_err(|e| HearscribeError::Extraction(format!("Failed to run FFmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.lines().last().unwrap_or("").to_string();
            return Err(HearscribeError::Extraction(format!(
                "FFmpeg failed for chunk {}: {}",
                spec.index, tail
            )));
        }

        // ffmpeg exits 0 on a seek past the end of the input but writes an
        // empty file; treat that as an out-of-bounds range.
        let produced = std::fs::metadata(dest)
            .map(|m| m.len())
            .unwrap_or(0);
        if produced == 0 {
            std::fs::remove_file(dest).ok();
            return Err(HearscribeError::Extraction(format!(
                "Chunk {} produced no data (time range out of bounds?)",
                spec.index
            )));
        }

        Ok(())
    }
}
