use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::audio::{probe_audio_file, segment, AudioFile, ChunkExtractor, ChunkSpec,
    SUPPORTED_EXTENSIONS};
use crate::config::Config;
use crate::cost::{self, CostEstimate};
use crate::error::{HearscribeError, Result};
use crate::transcribe::{ChunkResult, Transcriber};
use crate::transcript::{MergeOutcome, TranscriptDocument};

/// Pause between successful transcription calls so a many-chunk job does
/// not hammer the API.
const INTER_CHUNK_PAUSE: Duration = Duration::from_secs(1);

/// Everything decided before any paid call: the probed inputs, the files
/// that could not be probed, and the projected spend. The confirmation gate
/// happens between `plan` and `Pipeline::execute`.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub files: Vec<AudioFile>,
    pub skipped: Vec<(PathBuf, String)>,
    pub estimate: CostEstimate,
}

/// Per-file outcome for the run summary.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file_name: String,
    pub output_path: PathBuf,
    pub total_chunks: usize,
    pub successful_chunks: usize,
    pub outcome: MergeOutcome,
}

/// Aggregate outcome of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reports: Vec<FileReport>,
    /// Files that failed outside the chunk loop (e.g. output write errors).
    pub failures: Vec<(String, String)>,
    pub files_attempted: usize,
    pub quota_exhausted: bool,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn files_fully_transcribed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome == MergeOutcome::Full)
            .count()
    }

    pub fn total_chunks(&self) -> usize {
        self.reports.iter().map(|r| r.total_chunks).sum()
    }

    pub fn successful_chunks(&self) -> usize {
        self.reports.iter().map(|r| r.successful_chunks).sum()
    }
}

/// Enumerate candidate input files by supported extension, sorted by name.
pub fn enumerate_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                    files.push(path);
                }
            }
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Probe every candidate file and price the run. A file that cannot be
/// probed is skipped (and reported), not fatal; deciding what to do when
/// nothing survives is the caller's job.
pub fn plan(config: &Config) -> Result<RunPlan> {
    let candidates = enumerate_audio_files(&config.audio_folder)?;
    info!(
        "Found {} audio file(s) in {}",
        candidates.len(),
        config.audio_folder.display()
    );

    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for path in candidates {
        match probe_audio_file(&path) {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                skipped.push((path, e.to_string()));
            }
        }
    }

    let durations: Vec<Duration> = files.iter().map(|f| f.duration).collect();
    let estimate = cost::estimate(&durations, config.rate_per_minute)?;

    Ok(RunPlan {
        files,
        skipped,
        estimate,
    })
}

/// Drives the paid half of a run: one file at a time, one chunk at a time.
/// Per-chunk failures degrade a file to a partial transcript; per-file
/// failures degrade the summary; only quota exhaustion stops the run.
pub struct Pipeline {
    config: Config,
    transcriber: Box<dyn Transcriber>,
    extractor: Box<dyn ChunkExtractor>,
    cancelled: Arc<AtomicBool>,
    show_progress: bool,
    chunk_pause: Duration,
}

impl Pipeline {
    pub fn new(
        config: Config,
        transcriber: Box<dyn Transcriber>,
        extractor: Box<dyn ChunkExtractor>,
    ) -> Self {
        Self {
            config,
            transcriber,
            extractor,
            cancelled: Arc::new(AtomicBool::new(false)),
            show_progress: true,
            chunk_pause: INTER_CHUNK_PAUSE,
        }
    }

    /// Enable or disable progress bar display.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Share a cancellation flag; checked between chunks and between files.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Override the pause between chunk calls (tests set it to zero).
    pub fn with_chunk_pause(mut self, pause: Duration) -> Self {
        self.chunk_pause = pause;
        self
    }

    /// Process every file in the plan sequentially.
    pub async fn execute(&self, plan: &RunPlan) -> Result<RunSummary> {
        let start = Instant::now();
        let total_files = plan.files.len();

        let mut reports = Vec::new();
        let mut failures = Vec::new();
        let mut files_attempted = 0;
        let mut quota_exhausted = false;
        let mut cancelled = false;

        for (position, file) in plan.files.iter().enumerate() {
            if self.cancelled.load(Ordering::Relaxed) {
                warn!("Cancellation requested, stopping before the next file");
                cancelled = true;
                break;
            }

            info!(
                "Processing {}/{}: {} ({:.1} min, {:.1} MB)",
                position + 1,
                total_files,
                file.file_name(),
                file.duration.as_secs_f64() / 60.0,
                file.size_mb()
            );
            files_attempted += 1;

            match self.process_file(file).await {
                Ok(Some((report, quota_hit))) => {
                    info!(
                        "Completed {}: {}/{} chunks transcribed",
                        report.file_name, report.successful_chunks, report.total_chunks
                    );
                    reports.push(report);
                    if quota_hit {
                        error!("API quota exhausted; aborting the remaining run");
                        quota_exhausted = true;
                        break;
                    }
                }
                Ok(None) => {
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    error!("Failed to process {}: {e}", file.file_name());
                    failures.push((file.file_name(), e.to_string()));
                }
            }
        }

        let summary = RunSummary {
            reports,
            failures,
            files_attempted,
            quota_exhausted,
            cancelled,
            elapsed: start.elapsed(),
        };

        info!(
            "Run finished: {}/{} files fully transcribed, {}/{} chunks, {:.1}s",
            summary.files_fully_transcribed(),
            summary.files_attempted,
            summary.successful_chunks(),
            summary.total_chunks(),
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }

    /// Process one file: plan its chunks, resolve each in order, merge and
    /// write the transcript. Returns `None` when interrupted mid-file by
    /// cancellation (no document is written for the in-flight file).
    /// The boolean signals quota exhaustion to the file loop.
    async fn process_file(&self, file: &AudioFile) -> Result<Option<(FileReport, bool)>> {
        let split = file.needs_splitting(self.config.max_file_size_mb);

        let specs = if split {
            segment(
                file.duration,
                self.config.chunk_length(),
                self.config.overlap(),
            )?
        } else {
            // Small enough for a single request: submit the file as-is.
            vec![ChunkSpec {
                index: 0,
                start: Duration::ZERO,
                end: file.duration,
                overlap: Duration::ZERO,
            }]
        };

        let chunk_dir = self.config.chunks_folder.join(file.stem());
        if split {
            std::fs::create_dir_all(&chunk_dir)?;
            info!(
                "Splitting {} into {} chunks of up to {} min",
                file.file_name(),
                specs.len(),
                self.config.chunk_duration_minutes
            );
        }

        let progress = if self.show_progress {
            let pb = ProgressBar::new(specs.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut results: Vec<ChunkResult> = Vec::with_capacity(specs.len());
        let mut quota_hit = false;
        let mut interrupted = false;

        for spec in &specs {
            if self.cancelled.load(Ordering::Relaxed) {
                warn!(
                    "Cancellation requested, stopping {} before chunk {}",
                    file.file_name(),
                    spec.index
                );
                interrupted = true;
                break;
            }

            let (result, quota) = if split {
                self.process_chunk(file, spec, &chunk_dir).await
            } else {
                self.transcribe_path(&file.path, spec.index).await
            };

            if let Some(error) = result.error() {
                warn!(
                    "Chunk {} of {} failed: {error}",
                    spec.index,
                    file.file_name()
                );
            }
            let succeeded = result.is_success();
            quota_hit = quota;
            results.push(result);

            if let Some(pb) = &progress {
                pb.inc(1);
            }

            if quota_hit {
                break;
            }
            if succeeded && spec.index + 1 < specs.len() && !self.chunk_pause.is_zero() {
                tokio::time::sleep(self.chunk_pause).await;
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        if split {
            // The per-chunk cleanup already removed every chunk file.
            if let Err(e) = std::fs::remove_dir(&chunk_dir) {
                debug!("Leaving chunk directory {}: {e}", chunk_dir.display());
            }
        }

        if interrupted {
            return Ok(None);
        }

        let document = TranscriptDocument::merge(
            file.file_name(),
            self.config.model.clone(),
            self.config.language.clone(),
            results,
        );

        let output_path = self
            .config
            .transcriptions_folder
            .join(format!("{}.txt", file.stem()));
        std::fs::write(&output_path, document.render())?;

        if document.outcome == MergeOutcome::Partial {
            warn!(
                "Wrote partial transcript for {} ({} failed chunk(s)): {}",
                file.file_name(),
                document.failed_chunks().len(),
                output_path.display()
            );
        } else {
            info!("Wrote transcript: {}", output_path.display());
        }

        let report = FileReport {
            file_name: file.file_name(),
            output_path,
            total_chunks: document.total_chunks(),
            successful_chunks: document.successful_chunks(),
            outcome: document.outcome,
        };

        Ok(Some((report, quota_hit)))
    }

    /// Extract one chunk, transcribe it, and delete the chunk file on every
    /// path before the result is recorded. The boolean flags a quota
    /// failure, which must stop the run.
    async fn process_chunk(
        &self,
        file: &AudioFile,
        spec: &ChunkSpec,
        chunk_dir: &Path,
    ) -> (ChunkResult, bool) {
        let chunk_path = chunk_dir.join(format!(
            "{}_chunk_{:03}.{}",
            file.stem(),
            spec.index + 1,
            file.extension()
        ));

        if let Err(e) = self.extractor.extract(&file.path, spec, &chunk_path).await {
            // A failed extraction may still have left a partial file behind.
            remove_chunk_file(&chunk_path);
            let result = ChunkResult::Failed {
                index: spec.index,
                error: e.to_string(),
            };
            return (result, false);
        }

        let outcome = self.transcribe_path(&chunk_path, spec.index).await;
        remove_chunk_file(&chunk_path);
        outcome
    }

    async fn transcribe_path(&self, path: &Path, index: usize) -> (ChunkResult, bool) {
        match self.transcriber.transcribe_file(path).await {
            Ok(text) => (ChunkResult::Success { index, text }, false),
            Err(e) => {
                let quota = matches!(e, HearscribeError::QuotaExceeded(_));
                let result = ChunkResult::Failed {
                    index,
                    error: e.to_string(),
                };
                (result, quota)
            }
        }
    }
}

fn remove_chunk_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove chunk file {}: {e}", path.display());
        }
    }
}

/// Print the aggregate run summary to the console.
pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                     Transcription Complete                     ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "  Files:     {}/{} fully transcribed",
        summary.files_fully_transcribed(),
        summary.files_attempted
    );
    println!(
        "  Chunks:    {}/{} succeeded",
        summary.successful_chunks(),
        summary.total_chunks()
    );
    println!(
        "  Elapsed:   {:.1} minutes",
        summary.elapsed.as_secs_f64() / 60.0
    );
    println!();

    for report in &summary.reports {
        let status = match report.outcome {
            MergeOutcome::Full => "ok",
            MergeOutcome::Partial => "partial",
        };
        println!(
            "  [{status}] {} ({}/{} chunks) -> {}",
            report.file_name,
            report.successful_chunks,
            report.total_chunks,
            report.output_path.display()
        );
    }
    for (file_name, error) in &summary.failures {
        println!("  [failed] {file_name}: {error}");
    }

    if summary.quota_exhausted {
        println!();
        println!("  Run aborted early: API quota exhausted.");
    }
    if summary.cancelled {
        println!();
        println!("  Run cancelled; transcripts written so far remain valid.");
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
