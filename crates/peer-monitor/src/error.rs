//! Error type shared by the monitor state and the HTTP layer.

use thiserror::Error;

/// Result alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Failures produced by the monitor.
///
/// Only [`MonitorError::Validation`] reaches callers as a structured
/// response; everything else is reported as plain text with a 500 status.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Caller supplied an unusable request (blank `from` / `to`).
    #[error("{0}")]
    Validation(String),

    /// Request body grew past the configured limit while being read.
    #[error("body too large")]
    BodyTooLarge,

    /// Request body was not valid JSON for the expected shape.
    #[error("{0}")]
    MalformedBody(#[from] serde_json::Error),

    /// The body stream failed before completing.
    #[error("transport error: {0}")]
    Transport(String),

    /// Host introspection failed. Never surfaces past the sampler.
    #[error("sampler error: {0}")]
    Sampler(String),
}

impl MonitorError {
    /// Whether this error maps to a client-actionable 400 response.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl warp::reject::Reject for MonitorError {}
