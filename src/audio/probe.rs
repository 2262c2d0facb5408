use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use crate::error::{HearscribeError, Result};

use super::AudioFile;

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            HearscribeError::Extraction(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(HearscribeError::Extraction(
            "FFmpeg check failed".to_string(),
        ));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map_err(|e| {
            HearscribeError::Extraction(format!(
                "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(HearscribeError::Extraction(
            "FFprobe check failed".to_string(),
        ));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Probe duration and size without decoding the file.
///
/// Any failure (missing file, unreadable media, unparsable ffprobe output)
/// surfaces as `UnreadableFile` so the caller can skip this file and keep
/// probing the rest.
pub fn probe_audio_file(path: &Path) -> Result<AudioFile> {
    let unreadable = |detail: String| HearscribeError::UnreadableFile {
        path: path.display().to_string(),
        detail,
    };

    let metadata =
        std::fs::metadata(path).map_err(|e| unreadable(format!("cannot stat file: {e}")))?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .map_err(|e| unreadable(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(unreadable(format!("ffprobe failed: {}", stderr.trim())));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration_secs: f64 = duration_str
        .trim()
        .parse()
        .map_err(|e| unreadable(format!("cannot parse duration '{}': {e}", duration_str.trim())))?;

    if duration_secs <= 0.0 {
        return Err(unreadable(format!(
            "reported non-positive duration ({duration_secs}s)"
        )));
    }

    debug!(
        "Probed {}: {:.1}s, {} bytes",
        path.display(),
        duration_secs,
        metadata.len()
    );

    Ok(AudioFile {
        path: path.to_path_buf(),
        duration: Duration::from_secs_f64(duration_secs),
        size_bytes: metadata.len(),
    })
}
