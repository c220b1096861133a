//! Generative image API client.
//!
//! The stylization job depends only on the [`ImageGenerator`] trait;
//! [`GeminiClient`] is the production implementation.

pub mod gemini;
pub mod response;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Failure talking to the generation API.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key was configured; no request was sent.
    #[error("Generation API key is not configured")]
    MissingApiKey,

    #[error("Generation request timed out: {0}")]
    Timeout(String),

    #[error("Could not connect to generation API: {0}")]
    Connect(String),

    #[error("Generation request failed: {0}")]
    Request(String),

    /// Non-2xx response.
    #[error("Generation API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The body carried `error.status = "INTERNAL"`.
    #[error("Generation API internal error: {0}")]
    Internal(String),

    /// The body was not the JSON shape we expect, or embedded data was not valid base64.
    #[error("Invalid generation response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Transient failures are retried with backoff; everything else fails at once.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) | Self::Internal(_) => true,
            Self::Status { status, .. } => matches!(status, 429 | 500 | 503),
            Self::MissingApiKey | Self::Request(_) | Self::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Turns a hole photo or sketch into a stylized diagram.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Stylize `input` (encoded as `mime_type`).
    ///
    /// `Ok(None)` means the API answered but produced no image.
    /// `seed` keeps the look consistent across a course's holes.
    async fn stylize(
        &self,
        input: &[u8],
        mime_type: &str,
        seed: Option<i64>,
    ) -> Result<Option<Vec<u8>>, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::Timeout("t".into()).is_transient());
        assert!(GenerationError::Connect("c".into()).is_transient());
        assert!(GenerationError::Internal("i".into()).is_transient());
        for status in [429, 500, 503] {
            assert!(GenerationError::Status {
                status,
                message: String::new()
            }
            .is_transient());
        }

        for status in [400, 401, 403, 404, 502] {
            assert!(!GenerationError::Status {
                status,
                message: String::new()
            }
            .is_transient());
        }
        assert!(!GenerationError::MissingApiKey.is_transient());
        assert!(!GenerationError::InvalidResponse("x".into()).is_transient());
    }
}
