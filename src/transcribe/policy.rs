//! Retry policy for transcription calls, kept as pure functions so it can
//! be tested without any network.

use std::time::Duration;

/// Maximum attempts per chunk, including the first one.
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
pub const BASE_DELAY_MS: u64 = 1000;

/// OpenAI error type reported when the account is out of credit. A 429 with
/// this marker will keep failing, unlike an ordinary rate limit.
pub const INSUFFICIENT_QUOTA: &str = "insufficient_quota";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt: rate limit or server-side failure.
    Retryable,
    /// Will fail identically on retry: auth or validation rejection.
    Permanent,
    /// Account-level exhaustion; every further call in the run would fail.
    QuotaExhausted,
}

/// Classify an HTTP error response from the transcription service.
pub fn classify_response(status: u16, error_type: Option<&str>) -> ErrorClass {
    match status {
        429 if error_type == Some(INSUFFICIENT_QUOTA) => ErrorClass::QuotaExhausted,
        429 => ErrorClass::Retryable,
        500..=599 => ErrorClass::Retryable,
        _ => ErrorClass::Permanent,
    }
}

/// Classify a transport-level failure (no HTTP response at all).
pub fn classify_transport(error: &reqwest::Error) -> ErrorClass {
    if error.is_timeout() || error.is_connect() {
        ErrorClass::Retryable
    } else {
        ErrorClass::Permanent
    }
}

/// Delay before retry number `retry` (1-based): 1s, 2s, 4s, ...
pub fn backoff_delay(retry: u32) -> Duration {
    Duration::from_millis(BASE_DELAY_MS * 2u64.pow(retry.saturating_sub(1)))
}
