//! Invoice pipeline: PDF pre-check, analysis, envelope construction.

use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, warn};

use preap_analyzer::{AzureAnalyzer, DocumentAnalyzer, ReplayAnalyzer, Result as AnalyzerResult};
use preap_core::models::config::PreapConfig;
use preap_core::{
    inspect_pdf, PdfError, PreapEnvelope, Provenance, RawAnalysisResult, ResultAdapter, Stamper,
    SystemStamper,
};

/// Content type sent to the analysis service.
const CONTENT_TYPE: &str = "application/octet-stream";

/// Runs one file through the analyzer and the result adapter.
pub struct InvoiceProcessor<A, S = SystemStamper> {
    analyzer: A,
    adapter: ResultAdapter<S>,
}

impl<A: DocumentAnalyzer> InvoiceProcessor<A> {
    pub fn new(analyzer: A) -> Self {
        Self {
            analyzer,
            adapter: ResultAdapter::new(),
        }
    }
}

impl<A: DocumentAnalyzer, S: Stamper> InvoiceProcessor<A, S> {
    /// Use a custom id/timestamp source.
    pub fn with_adapter(analyzer: A, adapter: ResultAdapter<S>) -> Self {
        Self { analyzer, adapter }
    }

    /// Process a PDF on disk.
    pub async fn process_file(&self, path: &Path) -> anyhow::Result<PreapEnvelope> {
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
        info!("Processing file: {}", path.display());

        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let mut provenance = Provenance::new();
        provenance.insert("file_path".into(), path.display().to_string());
        provenance.insert("file_name".into(), file_name);
        provenance.insert("file_size".into(), data.len().to_string());

        self.process_bytes(data, provenance).await
    }

    /// Process PDF bytes. `provenance` is extended with the document type
    /// and, when the PDF could be read locally, its page count.
    ///
    /// Files the local parser cannot read are still sent for analysis;
    /// locked and empty PDFs are rejected.
    pub async fn process_bytes(
        &self,
        data: Vec<u8>,
        mut provenance: Provenance,
    ) -> anyhow::Result<PreapEnvelope> {
        provenance.insert("document_type".into(), "invoice".into());

        match inspect_pdf(&data) {
            Ok(info) => {
                debug!(
                    "PDF pre-check passed: {} pages, encrypted: {}",
                    info.page_count, info.encrypted
                );
                provenance.insert("page_count".into(), info.page_count.to_string());
            }
            Err(PdfError::Parse(reason)) => {
                warn!("Could not read PDF locally ({reason}), sending it for analysis as is");
            }
            Err(e) => return Err(e).context("PDF pre-check failed"),
        }

        let raw = self
            .analyzer
            .analyze(data, CONTENT_TYPE)
            .await
            .context("Document analysis failed")?;
        debug!("Analysis returned {} documents", raw.document_count());

        let envelope = self.adapter.build(raw, provenance)?;
        Ok(envelope)
    }
}

/// Analyzer chosen at runtime: the live service or a recorded result.
pub enum Analyzer {
    Azure(AzureAnalyzer),
    Replay(ReplayAnalyzer),
}

impl Analyzer {
    /// Replay `recording` when given, otherwise connect to the service
    /// using credentials from the environment.
    pub fn from_config(config: &PreapConfig, recording: Option<&Path>) -> anyhow::Result<Self> {
        match recording {
            Some(path) => {
                info!("Replaying recorded analysis from {}", path.display());
                Ok(Self::Replay(ReplayAnalyzer::from_file(path)?))
            }
            None => {
                let credentials = config.analyzer.credentials()?;
                debug!("Using analysis endpoint {}", credentials.endpoint);
                Ok(Self::Azure(AzureAnalyzer::new(credentials, &config.analyzer)?))
            }
        }
    }
}

impl DocumentAnalyzer for Analyzer {
    async fn analyze(&self, content: Vec<u8>, content_type: &str) -> AnalyzerResult<RawAnalysisResult> {
        match self {
            Self::Azure(analyzer) => analyzer.analyze(content, content_type).await,
            Self::Replay(analyzer) => analyzer.analyze(content, content_type).await,
        }
    }
}
