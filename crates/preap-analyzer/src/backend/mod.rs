//! Analysis backend implementations.

pub mod azure;
pub mod replay;

use std::future::Future;

use preap_core::RawAnalysisResult;

use crate::Result;

/// Trait for document analysis backends.
///
/// A backend takes the bytes of one file and returns the service's raw
/// result tree. Normalization happens elsewhere.
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze one document.
    ///
    /// # Arguments
    /// * `content` - File bytes
    /// * `content_type` - MIME type of `content`, e.g. `application/pdf`
    fn analyze(
        &self,
        content: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<RawAnalysisResult>> + Send;
}
