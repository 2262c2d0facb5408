use chrono::{DateTime, Local};

use crate::transcribe::ChunkResult;

/// Shortest duplicated boundary text (bytes) we are willing to treat as
/// chunk overlap. Anything shorter is too likely to be a coincidence.
const MIN_OVERLAP_MATCH: usize = 12;

/// How far back into the previous chunk's text the overlap search looks.
const OVERLAP_SEARCH_WINDOW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Every chunk transcribed; body is the merged text only.
    Full,
    /// At least one chunk failed; body carries a marker in its place.
    Partial,
}

/// The final per-file transcript, assembled after every chunk is resolved.
/// Immutable once rendered to disk.
#[derive(Debug, Clone)]
pub struct TranscriptDocument {
    pub source_name: String,
    pub recorded_at: DateTime<Local>,
    pub model: String,
    pub language: String,
    pub outcome: MergeOutcome,
    pub results: Vec<ChunkResult>,
}

impl TranscriptDocument {
    /// Assemble a document from one file's resolved chunks.
    pub fn merge(
        source_name: String,
        model: String,
        language: String,
        mut results: Vec<ChunkResult>,
    ) -> Self {
        results.sort_by_key(|r| r.index());

        let outcome = if results.iter().all(|r| r.is_success()) {
            MergeOutcome::Full
        } else {
            MergeOutcome::Partial
        };

        Self {
            source_name,
            recorded_at: Local::now(),
            model,
            language,
            outcome,
            results,
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.results.len()
    }

    pub fn successful_chunks(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_chunks(&self) -> Vec<(usize, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|e| (r.index(), e)))
            .collect()
    }

    /// Merged transcript text: successful chunks in sequence order separated
    /// by paragraph breaks, failed chunks replaced by explicit markers.
    pub fn body(&self) -> String {
        let mut paragraphs: Vec<String> = Vec::with_capacity(self.results.len());
        let mut previous_text: Option<&str> = None;

        for result in &self.results {
            match result {
                ChunkResult::Success { text, .. } => {
                    let trimmed = match previous_text {
                        Some(prev) => {
                            let skip = trim_overlap(prev, text);
                            text[skip..].trim()
                        }
                        None => text.trim(),
                    };
                    if !trimmed.is_empty() {
                        paragraphs.push(trimmed.to_string());
                    }
                    previous_text = Some(text);
                }
                ChunkResult::Failed { index, error } => {
                    paragraphs.push(format!("[chunk {index} failed: {error}]"));
                    // No text to de-duplicate against across the gap.
                    previous_text = None;
                }
            }
        }

        paragraphs.join("\n\n")
    }

    /// Full output file contents: metadata header, then the body.
    pub fn render(&self) -> String {
        let mut header = format!(
            "# Transcript of {}\n# Date: {}\n# Model: {}\n# Language: {}\n",
            self.source_name,
            self.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            self.model,
            self.language
        );

        if self.outcome == MergeOutcome::Partial {
            let failed: Vec<String> = self
                .failed_chunks()
                .iter()
                .map(|(index, _)| format!("chunk {index}"))
                .collect();
            header.push_str(&format!(
                "# Incomplete: {}/{} chunks failed ({})\n",
                self.failed_chunks().len(),
                self.total_chunks(),
                failed.join(", ")
            ));
        }

        format!("{}\n{}\n", header, self.body())
    }
}

/// Length of the prefix of `next` that duplicates the tail of `previous`.
///
/// Consecutive chunks share `overlap` seconds of audio, so the service
/// usually transcribes the boundary region twice. We only trim an exact
/// repeat that is long enough to be convincing and ends on a word boundary;
/// anything ambiguous returns 0 and the caller concatenates untouched.
fn trim_overlap(previous: &str, next: &str) -> usize {
    let prev = previous.trim_end();

    let mut tail_start = prev.len().saturating_sub(OVERLAP_SEARCH_WINDOW);
    while tail_start < prev.len() && !prev.is_char_boundary(tail_start) {
        tail_start += 1;
    }
    let max_len = (prev.len() - tail_start).min(next.len());

    let mut boundaries: Vec<usize> = next.char_indices().map(|(i, _)| i).collect();
    boundaries.push(next.len());

    for &n in boundaries.iter().rev() {
        if n > max_len {
            continue;
        }
        if n < MIN_OVERLAP_MATCH {
            break;
        }
        let ends_on_word = n == next.len() || next[n..].starts_with(char::is_whitespace);
        if ends_on_word && prev.ends_with(&next[..n]) {
            return n;
        }
    }

    0
}
