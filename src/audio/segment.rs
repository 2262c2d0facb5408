use std::time::Duration;

use crate::error::{HearscribeError, Result};

use super::ChunkSpec;

/// Plan the chunks covering `[0, duration)`.
///
/// Each chunk spans `[t, min(t + chunk_length, duration))` and the next one
/// starts `overlap` seconds before the current one ends, so adjacent
/// transcripts share a short audio region and no sentence is lost at a cut.
/// The plan is fully determined by its inputs.
pub fn segment(
    duration: Duration,
    chunk_length: Duration,
    overlap: Duration,
) -> Result<Vec<ChunkSpec>> {
    if chunk_length.is_zero() || chunk_length <= overlap {
        return Err(HearscribeError::Config(format!(
            "Chunk length ({:.0}s) must be greater than overlap ({:.0}s)",
            chunk_length.as_secs_f64(),
            overlap.as_secs_f64()
        )));
    }
    if duration.is_zero() {
        return Err(HearscribeError::Config(
            "Audio duration must be positive".to_string(),
        ));
    }

    let step = chunk_length - overlap;
    let mut chunks = Vec::new();
    let mut start = Duration::ZERO;

    loop {
        let end = (start + chunk_length).min(duration);
        let overlap_with_previous = if chunks.is_empty() {
            Duration::ZERO
        } else {
            overlap
        };
        chunks.push(ChunkSpec {
            index: chunks.len(),
            start,
            end,
            overlap: overlap_with_previous,
        });
        if end == duration {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
