//! Error types for the preap-core library.

use thiserror::Error;

/// Main error type for the preap library.
#[derive(Error, Debug)]
pub enum PreapError {
    /// The analysis result does not follow the expected structure.
    #[error("malformed analysis result: {0}")]
    Malformed(#[from] MalformedInputError),

    /// PDF pre-check error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Structural violations in a raw analysis result.
///
/// These are distinct from absent or unknown fields, which are not errors.
/// `path` points at the offending node, e.g.
/// `documents[0].fields.InvoiceTotal.valueCurrency`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedInputError {
    /// A node that must be an object is something else.
    #[error("expected an object at {path}")]
    NotAnObject { path: String },

    /// A node that must be a sequence is something else.
    #[error("expected a sequence at {path}")]
    NotASequence { path: String },

    /// A typed payload could not be read.
    #[error("invalid value at {path}: {reason}")]
    InvalidValue { path: String, reason: String },
}

impl MalformedInputError {
    pub(crate) fn not_an_object(path: impl Into<String>) -> Self {
        Self::NotAnObject { path: path.into() }
    }

    pub(crate) fn not_a_sequence(path: impl Into<String>) -> Self {
        Self::NotASequence { path: path.into() }
    }

    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Location of the violation inside the analysis result.
    pub fn path(&self) -> &str {
        match self {
            Self::NotAnObject { path }
            | Self::NotASequence { path }
            | Self::InvalidValue { path, .. } => path,
        }
    }
}

/// Errors related to the PDF pre-check.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Result type for the preap library.
pub type Result<T> = std::result::Result<T, PreapError>;
