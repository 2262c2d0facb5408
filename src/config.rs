use crate::error::{HearscribeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// OpenAI Whisper billing rate in USD per audio minute.
pub const DEFAULT_RATE_PER_MINUTE: f64 = 0.006;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub model: String,
    pub language: String,
    pub response_format: String,
    pub prompt: String,

    /// Target chunk duration in minutes for files that need splitting.
    pub chunk_duration_minutes: u64,
    /// Audio shared between consecutive chunks so sentences cut at a
    /// boundary appear in both transcripts.
    pub overlap_seconds: u64,
    /// Files above this size are split before upload (API limit is 25 MB).
    pub max_file_size_mb: u64,
    pub rate_per_minute: f64,

    pub audio_folder: PathBuf,
    pub chunks_folder: PathBuf,
    pub transcriptions_folder: PathBuf,
    pub logs_folder: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: "whisper-1".to_string(),
            language: "es".to_string(),
            response_format: "text".to_string(),
            prompt: "Este es un audio en español de Puerto Rico. \
                     Transcribe con puntuación correcta, incluyendo nombres propios \
                     y palabras en inglés que puedan aparecer. \
                     Mantén el formato natural del habla puertorriqueña."
                .to_string(),
            chunk_duration_minutes: 10,
            overlap_seconds: 30,
            max_file_size_mb: 24,
            rate_per_minute: DEFAULT_RATE_PER_MINUTE,
            audio_folder: PathBuf::from("audio"),
            chunks_folder: PathBuf::from("chunks"),
            transcriptions_folder: PathBuf::from("transcriptions"),
            logs_folder: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the optional config file, then a
    /// local `.env`, then process environment variables (highest priority).
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        dotenvy::dotenv().ok();

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(value) = std::env::var("CHUNK_DURATION_MINUTES") {
            if let Ok(minutes) = value.parse() {
                config.chunk_duration_minutes = minutes;
            }
        }
        if let Ok(value) = std::env::var("OVERLAP_SECONDS") {
            if let Ok(seconds) = value.parse() {
                config.overlap_seconds = seconds;
            }
        }
        if let Ok(value) = std::env::var("MAX_FILE_SIZE_MB") {
            if let Ok(mb) = value.parse() {
                config.max_file_size_mb = mb;
            }
        }
        if let Ok(language) = std::env::var("LANGUAGE") {
            config.language = language;
        }
        if let Ok(prompt) = std::env::var("PROMPT") {
            config.prompt = prompt;
        }
        if let Ok(folder) = std::env::var("AUDIO_FOLDER") {
            config.audio_folder = PathBuf::from(folder);
        }
        if let Ok(folder) = std::env::var("CHUNKS_FOLDER") {
            config.chunks_folder = PathBuf::from(folder);
        }
        if let Ok(folder) = std::env::var("TRANSCRIPTIONS_FOLDER") {
            config.transcriptions_folder = PathBuf::from(folder);
        }
        if let Ok(folder) = std::env::var("LOGS_FOLDER") {
            config.logs_folder = PathBuf::from(folder);
        }

        Ok(config)
    }

    /// Reject configurations that would make the run fail after paid calls
    /// have already started.
    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.as_deref().unwrap_or("").is_empty() {
            return Err(HearscribeError::Config(
                "OPENAI_API_KEY not set. Export it or add it to .env".to_string(),
            ));
        }

        if self.chunk_duration_minutes == 0 {
            return Err(HearscribeError::Config(
                "Chunk duration must be at least 1 minute".to_string(),
            ));
        }

        if self.overlap() >= self.chunk_length() {
            return Err(HearscribeError::Config(format!(
                "Overlap ({}s) must be shorter than the chunk length ({}s)",
                self.overlap_seconds,
                self.chunk_length().as_secs()
            )));
        }

        if self.max_file_size_mb == 0 {
            return Err(HearscribeError::Config(
                "Maximum file size must be at least 1 MB".to_string(),
            ));
        }

        if self.rate_per_minute < 0.0 {
            return Err(HearscribeError::Config(
                "Billing rate cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    pub fn chunk_length(&self) -> Duration {
        Duration::from_secs(self.chunk_duration_minutes * 60)
    }

    pub fn overlap(&self) -> Duration {
        Duration::from_secs(self.overlap_seconds)
    }

    /// Create the working folders if they do not exist yet.
    pub fn ensure_directories(&self) -> Result<()> {
        for folder in [
            &self.audio_folder,
            &self.chunks_folder,
            &self.transcriptions_folder,
            &self.logs_folder,
        ] {
            std::fs::create_dir_all(folder)?;
        }
        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hearscribe").join("config.toml"))
    }
}
