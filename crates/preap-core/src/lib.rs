//! Core library for PREAP invoice result normalization.
//!
//! This crate provides:
//! - The invoice field catalog (document fields and line-item fields)
//! - A typed view over raw document-analysis results
//! - The adapter that projects a result into a PREAP envelope
//! - A PDF pre-check run before files are sent for analysis

pub mod adapter;
pub mod catalog;
pub mod error;
pub mod models;
pub mod pdf;

pub use adapter::{FixedStamper, ResultAdapter, Stamper, SystemStamper};
pub use catalog::{recognized_fields, recognized_item_fields, FieldKind, FieldSpec, Placement};
pub use error::{MalformedInputError, PdfError, PreapError, Result};
pub use models::analysis::RawAnalysisResult;
pub use models::config::PreapConfig;
pub use models::envelope::{PreapEnvelope, Provenance, PREAP_VERSION};
pub use pdf::{inspect as inspect_pdf, PdfInfo};
