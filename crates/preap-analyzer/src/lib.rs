//! Document analysis layer for preap.
//!
//! This crate provides a single interface for obtaining raw analysis
//! results, with two backends:
//! - `AzureAnalyzer` calls the Document Intelligence REST API
//! - `ReplayAnalyzer` returns a previously recorded result

mod backend;
mod error;

pub use backend::azure::AzureAnalyzer;
pub use backend::replay::ReplayAnalyzer;
pub use backend::DocumentAnalyzer;
pub use error::AnalyzerError;

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalyzerError>;
