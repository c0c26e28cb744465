//! Error types for the analysis layer.

use preap_core::MalformedInputError;
use thiserror::Error;

/// Errors that can occur while obtaining an analysis result.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the credentials.
    #[error("authentication failed ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    /// The service is throttling requests.
    #[error("quota exceeded: {body}")]
    QuotaExceeded { body: String },

    /// Any other non-success status.
    #[error("service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// The submit response carried no polling URL.
    #[error("no Operation-Location header in analyze response")]
    MissingOperationLocation,

    /// The service finished the operation with a failure.
    #[error("analysis failed [{code}]: {message}")]
    AnalysisFailed { code: String, message: String },

    /// The operation did not finish within the polling budget.
    #[error("analysis did not complete after {attempts} polls")]
    Timeout { attempts: u32 },

    /// The response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response did not hold an analysis result.
    #[error("malformed analysis result: {0}")]
    Malformed(#[from] MalformedInputError),

    /// I/O error when reading recorded results.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status, body },
            429 => Self::QuotaExceeded { body },
            _ => Self::Service { status, body },
        }
    }
}
