//! Integration tests for hearscribe
//!
//! These tests exercise the chunking, costing, merging, and pipeline logic
//! with fake extraction and transcription, without ffmpeg or API keys.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use hearscribe::audio::{segment, AudioFile, ChunkExtractor, ChunkSpec};
use hearscribe::config::Config;
use hearscribe::cost;
use hearscribe::error::{HearscribeError, Result};
use hearscribe::pipeline::{Pipeline, RunPlan};
use hearscribe::transcribe::Transcriber;
use hearscribe::transcript::MergeOutcome;

// ============================================================================
// Test doubles
// ============================================================================

/// Writes a stub file instead of running ffmpeg.
struct FakeExtractor;

#[async_trait]
impl ChunkExtractor for FakeExtractor {
    async fn extract(&self, _source: &Path, spec: &ChunkSpec, dest: &Path) -> Result<()> {
        std::fs::write(dest, format!("audio for chunk {}", spec.index))?;
        Ok(())
    }
}

/// Leaves a partial file behind and then fails, like an interrupted ffmpeg.
struct BrokenExtractor;

#[async_trait]
impl ChunkExtractor for BrokenExtractor {
    async fn extract(&self, _source: &Path, _spec: &ChunkSpec, dest: &Path) -> Result<()> {
        std::fs::write(dest, "truncated")?;
        Err(HearscribeError::Extraction("stream ended early".to_string()))
    }
}

/// Succeeds or fails per call position, in chunk order.
struct ScriptedTranscriber {
    calls: AtomicUsize,
    fail_on: Vec<usize>,
    quota_on: Option<usize>,
}

impl ScriptedTranscriber {
    fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Vec::new(),
            quota_on: None,
        }
    }

    fn failing_on(positions: &[usize]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: positions.to_vec(),
            quota_on: None,
        }
    }

    fn quota_on(position: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Vec::new(),
            quota_on: Some(position),
        }
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe_file(&self, _audio: &Path) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.quota_on == Some(call) {
            return Err(HearscribeError::QuotaExceeded(
                "429: You exceeded your current quota".to_string(),
            ));
        }
        if self.fail_on.contains(&call) {
            return Err(HearscribeError::TransientService {
                attempts: 3,
                detail: "request timed out".to_string(),
            });
        }
        Ok(format!("texto del segmento {call}"))
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }

    fn max_file_size(&self) -> u64 {
        25 * 1024 * 1024
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn test_config(root: &Path) -> Config {
    Config {
        openai_api_key: Some("sk-test".to_string()),
        audio_folder: root.join("audio"),
        chunks_folder: root.join("chunks"),
        transcriptions_folder: root.join("transcriptions"),
        logs_folder: root.join("logs"),
        ..Config::default()
    }
}

fn fake_audio_file(config: &Config, name: &str, minutes: u64, size_mb: u64) -> AudioFile {
    let path = config.audio_folder.join(name);
    std::fs::write(&path, b"stub source audio").unwrap();
    AudioFile {
        path,
        duration: Duration::from_secs(minutes * 60),
        size_bytes: size_mb * 1024 * 1024,
    }
}

fn plan_for(config: &Config, files: Vec<AudioFile>) -> RunPlan {
    let durations: Vec<Duration> = files.iter().map(|f| f.duration).collect();
    let estimate = cost::estimate(&durations, config.rate_per_minute).unwrap();
    RunPlan {
        files,
        skipped: Vec::new(),
        estimate,
    }
}

fn pipeline_with(
    config: Config,
    transcriber: Box<dyn Transcriber>,
    extractor: Box<dyn ChunkExtractor>,
) -> Pipeline {
    Pipeline::new(config, transcriber, extractor)
        .with_progress(false)
        .with_chunk_pause(Duration::ZERO)
}

/// Files left anywhere under the scratch chunks folder.
fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                found.extend(files_under(&path));
            } else {
                found.push(path);
            }
        }
    }
    found
}

// ============================================================================
// Segmenter and cost estimator scenarios
// ============================================================================

mod planning_tests {
    use super::*;

    #[test]
    fn test_segment_hearing_scenario() {
        let chunks = segment(
            Duration::from_secs(1500),
            Duration::from_secs(600),
            Duration::from_secs(30),
        )
        .unwrap();

        let ranges: Vec<(u64, u64)> = chunks
            .iter()
            .map(|c| (c.start.as_secs(), c.end.as_secs()))
            .collect();
        assert_eq!(ranges, vec![(0, 600), (570, 1170), (1140, 1500)]);
    }

    #[test]
    fn test_cost_scenario() {
        let estimate = cost::estimate(
            &[Duration::from_secs(3600), Duration::from_secs(1800)],
            0.006,
        )
        .unwrap();
        assert_eq!(estimate.total_minutes, 90.0);
        assert!((estimate.total_cost - 0.54).abs() < 1e-9);
    }
}

// ============================================================================
// Pipeline behavior
// ============================================================================

mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_large_file_full_transcription() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        config.ensure_directories().unwrap();

        // 25 minutes over the size limit: 3 chunks.
        let file = fake_audio_file(&config, "hearing_01.mp3", 25, 50);
        let plan = plan_for(&config, vec![file]);

        let pipeline = pipeline_with(
            config.clone(),
            Box::new(ScriptedTranscriber::succeeding()),
            Box::new(FakeExtractor),
        );
        let summary = pipeline.execute(&plan).await.unwrap();

        assert_eq!(summary.files_attempted, 1);
        assert_eq!(summary.files_fully_transcribed(), 1);
        assert_eq!(summary.total_chunks(), 3);
        assert_eq!(summary.successful_chunks(), 3);
        assert!(!summary.quota_exhausted);

        let output = config.transcriptions_folder.join("hearing_01.txt");
        let contents = std::fs::read_to_string(&output).unwrap();
        assert!(contents.contains("# Transcript of hearing_01.mp3"));
        assert!(contents.contains("texto del segmento 0"));
        assert!(contents.contains("texto del segmento 2"));
        let pos0 = contents.find("texto del segmento 0").unwrap();
        let pos2 = contents.find("texto del segmento 2").unwrap();
        assert!(pos0 < pos2);
    }

    #[tokio::test]
    async fn test_small_file_is_not_split() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        config.ensure_directories().unwrap();

        let file = fake_audio_file(&config, "short.mp3", 5, 10);
        let plan = plan_for(&config, vec![file]);

        let pipeline = pipeline_with(
            config.clone(),
            Box::new(ScriptedTranscriber::succeeding()),
            Box::new(BrokenExtractor),
        );
        let summary = pipeline.execute(&plan).await.unwrap();

        // The broken extractor was never invoked: no splitting happened.
        assert_eq!(summary.total_chunks(), 1);
        assert_eq!(summary.successful_chunks(), 1);
        assert_eq!(summary.files_fully_transcribed(), 1);
        assert!(files_under(&config.chunks_folder).is_empty());
    }

    #[tokio::test]
    async fn test_failed_chunk_degrades_to_partial() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        config.ensure_directories().unwrap();

        // 45 minutes: chunks at 0, 570, 1140, 1710, 2280 seconds.
        let file = fake_audio_file(&config, "hearing_02.mp3", 45, 80);
        let plan = plan_for(&config, vec![file]);

        let pipeline = pipeline_with(
            config.clone(),
            Box::new(ScriptedTranscriber::failing_on(&[2])),
            Box::new(FakeExtractor),
        );
        let summary = pipeline.execute(&plan).await.unwrap();

        assert_eq!(summary.total_chunks(), 5);
        assert_eq!(summary.successful_chunks(), 4);
        assert_eq!(summary.files_fully_transcribed(), 0);
        assert_eq!(summary.reports[0].outcome, MergeOutcome::Partial);

        let contents =
            std::fs::read_to_string(config.transcriptions_folder.join("hearing_02.txt")).unwrap();
        assert!(contents.contains("# Incomplete: 1/5 chunks failed (chunk 2)"));
        assert!(contents.contains("[chunk 2 failed:"));
        for present in [0, 1, 3, 4] {
            assert!(contents.contains(&format!("texto del segmento {present}")));
        }
        assert!(!contents.contains("texto del segmento 2"));
    }

    #[tokio::test]
    async fn test_chunk_files_never_remain_on_disk() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        config.ensure_directories().unwrap();

        let file = fake_audio_file(&config, "hearing_03.mp3", 25, 50);
        let plan = plan_for(&config, vec![file]);

        // Chunk 1 fails after extraction; its temp file must still go away.
        let pipeline = pipeline_with(
            config.clone(),
            Box::new(ScriptedTranscriber::failing_on(&[1])),
            Box::new(FakeExtractor),
        );
        pipeline.execute(&plan).await.unwrap();

        assert!(files_under(&config.chunks_folder).is_empty());
    }

    #[tokio::test]
    async fn test_extraction_failure_is_recorded_and_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        config.ensure_directories().unwrap();

        let file = fake_audio_file(&config, "hearing_04.mp3", 25, 50);
        let plan = plan_for(&config, vec![file]);

        let pipeline = pipeline_with(
            config.clone(),
            Box::new(ScriptedTranscriber::succeeding()),
            Box::new(BrokenExtractor),
        );
        let summary = pipeline.execute(&plan).await.unwrap();

        assert_eq!(summary.successful_chunks(), 0);
        assert_eq!(summary.reports[0].outcome, MergeOutcome::Partial);
        assert!(files_under(&config.chunks_folder).is_empty());

        // Zero successful chunks still produces a document of markers.
        let contents =
            std::fs::read_to_string(config.transcriptions_folder.join("hearing_04.txt")).unwrap();
        assert!(contents.contains("[chunk 0 failed:"));
        assert!(contents.contains("stream ended early"));
    }

    #[tokio::test]
    async fn test_quota_exhaustion_aborts_remaining_run() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        config.ensure_directories().unwrap();

        let first = fake_audio_file(&config, "a_first.mp3", 5, 10);
        let second = fake_audio_file(&config, "b_second.mp3", 5, 10);
        let plan = plan_for(&config, vec![first, second]);

        let pipeline = pipeline_with(
            config.clone(),
            Box::new(ScriptedTranscriber::quota_on(0)),
            Box::new(FakeExtractor),
        );
        let summary = pipeline.execute(&plan).await.unwrap();

        assert!(summary.quota_exhausted);
        assert_eq!(summary.files_attempted, 1);
        assert_eq!(summary.reports.len(), 1);

        // The interrupted file still gets its (all-markers) document, the
        // untouched one gets nothing.
        assert!(config.transcriptions_folder.join("a_first.txt").exists());
        assert!(!config.transcriptions_folder.join("b_second.txt").exists());
    }

    #[tokio::test]
    async fn test_run_continues_after_mid_run_failures() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        config.ensure_directories().unwrap();

        let first = fake_audio_file(&config, "a_first.mp3", 5, 10);
        let second = fake_audio_file(&config, "b_second.mp3", 5, 10);
        let third = fake_audio_file(&config, "c_third.mp3", 5, 10);
        let plan = plan_for(&config, vec![first, second, third]);

        // Second file's only chunk fails; the run still reaches the third.
        let pipeline = pipeline_with(
            config.clone(),
            Box::new(ScriptedTranscriber::failing_on(&[1])),
            Box::new(FakeExtractor),
        );
        let summary = pipeline.execute(&plan).await.unwrap();

        assert_eq!(summary.files_attempted, 3);
        assert_eq!(summary.files_fully_transcribed(), 2);
        assert!(config.transcriptions_folder.join("b_second.txt").exists());
        assert!(config.transcriptions_folder.join("c_third.txt").exists());
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("OPENAI_API_KEY", "sk-from-env");
        std::env::set_var("CHUNK_DURATION_MINUTES", "5");
        std::env::set_var("LANGUAGE", "en");

        let config = Config::load().unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-from-env"));
        assert_eq!(config.chunk_duration_minutes, 5);
        assert_eq!(config.language, "en");

        std::env::remove_var("CHUNK_DURATION_MINUTES");
        std::env::remove_var("LANGUAGE");
    }

    #[test]
    fn test_ensure_directories() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        config.ensure_directories().unwrap();

        assert!(config.audio_folder.is_dir());
        assert!(config.chunks_folder.is_dir());
        assert!(config.transcriptions_folder.is_dir());
        assert!(config.logs_folder.is_dir());
    }
}
