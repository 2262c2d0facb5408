use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{HearscribeError, Result};
use crate::transcribe::policy::{self, ErrorClass, MAX_RETRIES};
use crate::transcribe::Transcriber;

/// OpenAI Whisper API endpoint.
const WHISPER_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Maximum file size for the Whisper API (25 MB).
pub const MAX_FILE_SIZE: u64 = 25 * 1024 * 1024;

/// OpenAI Whisper API client for single-chunk transcription.
pub struct WhisperClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    language: Option<String>,
    prompt: Option<String>,
    response_format: String,
}

/// How one attempt failed, before retry bookkeeping turns it into a
/// crate error.
enum CallFailure {
    Retryable(String),
    Permanent(String),
    Quota(String),
    Other(HearscribeError),
}

impl WhisperClient {
    /// Create a new Whisper client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: WHISPER_API_URL.to_string(),
            api_key,
            model: "whisper-1".to_string(),
            language: None,
            prompt: None,
            response_format: "text".to_string(),
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    /// Set a prompt for vocabulary hints (max 224 tokens).
    pub fn with_prompt(mut self, prompt: String) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Set the response format ("text", "json" or "verbose_json").
    pub fn with_response_format(mut self, format: String) -> Self {
        self.response_format = format;
        self
    }

    /// Override the API endpoint, used by tests against a mock server.
    pub fn with_api_url(mut self, url: String) -> Self {
        self.api_url = url;
        self
    }

    /// Build the multipart form for the API request.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("ogg") => "audio/ogg",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", self.response_format.clone());

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        if let Some(ref prompt) = self.prompt {
            form = form.text("prompt", prompt.clone());
        }

        Ok(form)
    }

    /// Make one API call (the form is consumed, so retries rebuild it).
    async fn call_api(&self, form: Form) -> std::result::Result<String, CallFailure> {
        let response = match self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Err(match policy::classify_transport(&e) {
                    ErrorClass::Retryable => CallFailure::Retryable(e.to_string()),
                    _ => CallFailure::Other(HearscribeError::Http(e)),
                });
            }
        };

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        if status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => return Err(CallFailure::Retryable(e.to_string())),
            };
            return match self.response_format.as_str() {
                "json" | "verbose_json" => match serde_json::from_str::<WhisperResponse>(&body) {
                    Ok(parsed) => Ok(parsed.text),
                    Err(e) => Err(CallFailure::Other(HearscribeError::Json(e))),
                },
                _ => Ok(body),
            };
        }

        let error_body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ApiErrorResponse>(&error_body).ok();
        let error_type = parsed.as_ref().map(|e| e.error.r#type.clone());
        let message = parsed
            .map(|e| e.error.message)
            .unwrap_or_else(|| error_body.trim().to_string());
        let detail = format!("{status}: {message}");

        Err(
            match policy::classify_response(status.as_u16(), error_type.as_deref()) {
                ErrorClass::Retryable => CallFailure::Retryable(detail),
                ErrorClass::Permanent => CallFailure::Permanent(detail),
                ErrorClass::QuotaExhausted => CallFailure::Quota(detail),
            },
        )
    }

    /// Bounded retry: transient failures get `MAX_RETRIES` attempts with
    /// exponential backoff, everything else fails on the first attempt.
    async fn transcribe_with_retry(&self, audio: &Path) -> Result<String> {
        let mut last_detail = String::new();

        for attempt in 1..=MAX_RETRIES {
            if attempt > 1 {
                let delay = policy::backoff_delay(attempt - 1);
                debug!("Retrying after {:?} (attempt {attempt}/{MAX_RETRIES})", delay);
                tokio::time::sleep(delay).await;
            }

            let form = self.build_form(audio).await?;

            match self.call_api(form).await {
                Ok(text) => return Ok(text),
                Err(CallFailure::Retryable(detail)) => {
                    warn!("Attempt {attempt} failed: {detail}");
                    last_detail = detail;
                }
                Err(CallFailure::Permanent(detail)) => {
                    return Err(HearscribeError::PermanentService(detail));
                }
                Err(CallFailure::Quota(detail)) => {
                    return Err(HearscribeError::QuotaExceeded(detail));
                }
                Err(CallFailure::Other(e)) => return Err(e),
            }
        }

        Err(HearscribeError::TransientService {
            attempts: MAX_RETRIES,
            detail: last_detail,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe_file(&self, audio: &Path) -> Result<String> {
        debug!("Transcribing {} with Whisper", audio.display());

        let metadata = fs::metadata(audio).await?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(HearscribeError::PermanentService(format!(
                "File too large for Whisper API: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        self.transcribe_with_retry(audio).await
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    fn max_file_size(&self) -> u64 {
        MAX_FILE_SIZE
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    r#type: String,
}
