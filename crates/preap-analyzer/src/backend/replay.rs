//! Backend that replays a recorded analysis result.

use std::path::Path;

use preap_core::RawAnalysisResult;
use tracing::debug;

use crate::{DocumentAnalyzer, Result};

/// Returns the same recorded result for every document.
///
/// The recording may be a bare `analyzeResult` tree or the full operation
/// body the service returns when polled.
#[derive(Debug, Clone)]
pub struct ReplayAnalyzer {
    result: RawAnalysisResult,
}

impl ReplayAnalyzer {
    /// Wrap an in-memory result.
    pub fn new(result: RawAnalysisResult) -> Self {
        Self { result }
    }

    /// Load a recording from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading recorded analysis from: {}", path.display());

        let body: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        Ok(Self::new(RawAnalysisResult::from_operation(body)?))
    }
}

impl DocumentAnalyzer for ReplayAnalyzer {
    async fn analyze(&self, content: Vec<u8>, _content_type: &str) -> Result<RawAnalysisResult> {
        debug!("Replaying recorded analysis for {} bytes", content.len());
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replay_unwraps_operation_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorded.json");
        let body = json!({ "status": "succeeded", "analyzeResult": { "modelId": "prebuilt-invoice", "documents": [] } });
        std::fs::write(&path, body.to_string()).unwrap();

        let analyzer = ReplayAnalyzer::from_file(&path).unwrap();
        let result = analyzer.analyze(b"%PDF-".to_vec(), "application/pdf").await.unwrap();
        assert_eq!(result.as_value()["modelId"], "prebuilt-invoice");
    }

    #[test]
    fn test_replay_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorded.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            ReplayAnalyzer::from_file(&path),
            Err(crate::AnalyzerError::Malformed(_))
        ));
    }
}
