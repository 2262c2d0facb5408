use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use hearscribe::audio::{check_ffmpeg, check_ffprobe, FfmpegExtractor};
use hearscribe::config::Config;
use hearscribe::transcribe::WhisperClient;
use hearscribe::{gate, pipeline, Pipeline};

#[derive(Parser)]
#[command(name = "hearscribe")]
#[command(version, about = "Batch transcription of long hearing recordings")]
#[command(
    long_about = "Transcribe every audio file in the input folder with the OpenAI Whisper API, \
splitting long recordings into overlapping chunks and reassembling the results."
)]
struct Cli {
    /// Only compute and show the cost estimate, without transcribing
    #[arg(long)]
    dry_run: bool,

    /// Skip the cost confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Override the configured audio input folder
    #[arg(long)]
    audio_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Console logging plus a per-run log file in the logs folder.
fn init_logging(verbose: bool, logs_folder: &Path) -> WorkerGuard {
    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let file_appender =
        tracing_appender::rolling::never(logs_folder, format!("transcription_{timestamp}.log"));
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_filter(console_level),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(file_writer)
                .with_filter(LevelFilter::DEBUG),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(dir) = cli.audio_dir {
        config.audio_folder = dir;
    }
    config
        .validate()
        .context("Configuration validation failed")?;
    config
        .ensure_directories()
        .context("Failed to create working folders")?;

    let _log_guard = init_logging(cli.verbose, &config.logs_folder);

    check_ffprobe().context("FFprobe is required to read audio durations")?;
    if check_ffmpeg().is_err() {
        warn!("FFmpeg not found; files above the size limit cannot be split");
    }

    let plan = pipeline::plan(&config)?;

    if plan.files.is_empty() {
        if plan.skipped.is_empty() {
            anyhow::bail!(
                "No audio files found in {}",
                config.audio_folder.display()
            );
        }
        anyhow::bail!(
            "None of the {} audio file(s) in {} could be probed",
            plan.skipped.len(),
            config.audio_folder.display()
        );
    }

    gate::display_plan(&plan, &config);

    if cli.dry_run {
        info!("Dry run: no transcription requested");
        return Ok(());
    }

    if !cli.yes && !gate::confirm()? {
        println!("Cancelled.");
        return Ok(());
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let flag = cancelled.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nStopping after the current chunk...");
            flag.store(true, Ordering::Relaxed);
        })
        .context("Failed to install Ctrl+C handler")?;
    }

    let api_key = config.openai_api_key.clone().unwrap_or_default();
    let client = WhisperClient::new(api_key)
        .with_model(config.model.clone())
        .with_language(config.language.clone())
        .with_prompt(config.prompt.clone())
        .with_response_format(config.response_format.clone());

    let pipeline = Pipeline::new(config, Box::new(client), Box::new(FfmpegExtractor))
        .with_cancel_flag(cancelled);

    let summary = pipeline.execute(&plan).await?;
    pipeline::print_summary(&summary);

    // Failed chunks degrade the output but are not a process failure; they
    // are reported above and marked in the transcripts.
    Ok(())
}
