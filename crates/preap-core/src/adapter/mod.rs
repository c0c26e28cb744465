//! Projection from raw analysis results to PREAP envelopes.
//!
//! [`ResultAdapter::build`] is a pure function of its inputs plus a
//! generated identifier and timestamp, both supplied by a [`Stamper`].

mod fields;

pub use fields::{extract_fields, extract_items, extract_tables};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::catalog::{document_fields, item_fields};
use crate::error::MalformedInputError;
use crate::models::analysis::{AnalyzedDocument, RawAnalysisResult};
use crate::models::envelope::{
    AnalysisMetadata, ExtractedData, ExtractedDocument, FullAnalysis, PreapEnvelope, Provenance,
    PREAP_VERSION,
};

/// Source of the two non-deterministic envelope values.
pub trait Stamper: Send + Sync {
    /// Fresh envelope identifier.
    fn preap_id(&self) -> Uuid;

    /// Generation time.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Random v4 identifiers and the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStamper;

impl Stamper for SystemStamper {
    fn preap_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Constant identifier and timestamp, for reproducible output.
#[derive(Debug, Clone, Copy)]
pub struct FixedStamper {
    pub preap_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl Stamper for FixedStamper {
    fn preap_id(&self) -> Uuid {
        self.preap_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Builds PREAP envelopes from raw analysis results.
#[derive(Debug, Clone, Default)]
pub struct ResultAdapter<S = SystemStamper> {
    stamper: S,
}

impl ResultAdapter {
    /// Create an adapter using random ids and the system clock.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Stamper> ResultAdapter<S> {
    /// Create an adapter with a custom id/timestamp source.
    pub fn with_stamper(stamper: S) -> Self {
        Self { stamper }
    }

    /// Build the envelope for one analysis result.
    ///
    /// Absent or unknown fields are not errors; only a result that breaks
    /// the expected structure fails.
    pub fn build(
        &self,
        raw: RawAnalysisResult,
        provenance: Provenance,
    ) -> Result<PreapEnvelope, MalformedInputError> {
        let extracted_data = self.extract(&raw)?;

        Ok(PreapEnvelope {
            preap_version: PREAP_VERSION.to_string(),
            preap_id: self.stamper.preap_id(),
            timestamp: self.stamper.timestamp(),
            source: provenance,
            extracted_data,
            full_analysis: full_analysis(raw),
        })
    }

    /// Normalized extraction only, without the envelope.
    pub fn extract(&self, raw: &RawAnalysisResult) -> Result<ExtractedData, MalformedInputError> {
        let documents = raw
            .documents()?
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                let path = format!("documents[{idx}]");
                let document = AnalyzedDocument::parse(value, &path)?;
                extract_document(&document, idx + 1, &path)
            })
            .collect::<Result<Vec<_>, MalformedInputError>>()?;

        Ok(ExtractedData { documents })
    }
}

fn extract_document(
    document: &AnalyzedDocument,
    document_number: usize,
    path: &str,
) -> Result<ExtractedDocument, MalformedInputError> {
    let fields_path = format!("{path}.fields");
    Ok(ExtractedDocument {
        document_number,
        fields: extract_fields(&document.fields, document_fields(), &fields_path)?,
        items: extract_items(&document.fields, document_fields(), item_fields(), &fields_path)?,
        tables: extract_tables(&document.tables),
    })
}

/// Move the audited subtrees out of the raw result. The tree is owned, so
/// later changes to the extracted data cannot reach it.
fn full_analysis(raw: RawAnalysisResult) -> FullAnalysis {
    let mut root = match raw.into_value() {
        Value::Object(map) => map,
        _ => Default::default(),
    };
    // Defaults fill in absent keys only; an explicit null is kept.
    let mut take = |key: &str, default: fn() -> Value| root.remove(key).unwrap_or_else(default);

    FullAnalysis {
        metadata: AnalysisMetadata {
            api_version: take("apiVersion", || Value::Null),
            model_id: take("modelId", || Value::Null),
            content_format: take("contentFormat", || Value::from("text")),
        },
        content: take("content", || Value::from("")),
        pages: take("pages", || Value::Array(Vec::new())),
        documents: take("documents", || Value::Array(Vec::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn adapter() -> ResultAdapter<FixedStamper> {
        ResultAdapter::with_stamper(FixedStamper {
            preap_id: Uuid::nil(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        })
    }

    fn provenance() -> Provenance {
        Provenance::from([
            ("file_name".to_string(), "a.pdf".to_string()),
            ("document_type".to_string(), "invoice".to_string()),
        ])
    }

    #[test]
    fn test_envelope_header() {
        let envelope = adapter()
            .build(RawAnalysisResult::from_value(json!({})), provenance())
            .unwrap();

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["preap_version"], "1.0");
        assert_eq!(json["preap_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(json["source"], json!({ "file_name": "a.pdf", "document_type": "invoice" }));
    }

    #[test]
    fn test_missing_passthrough_sections_get_defaults() {
        let envelope = adapter()
            .build(RawAnalysisResult::from_value(json!({ "modelId": "prebuilt-invoice" })), provenance())
            .unwrap();

        assert_eq!(
            serde_json::to_value(&envelope.full_analysis).unwrap(),
            json!({
                "metadata": { "apiVersion": null, "modelId": "prebuilt-invoice", "contentFormat": "text" },
                "content": "",
                "pages": [],
                "documents": []
            })
        );
    }

    #[test]
    fn test_explicit_nulls_pass_through() {
        let raw = RawAnalysisResult::from_value(json!({
            "contentFormat": null,
            "content": null,
            "pages": null
        }));
        let envelope = adapter().build(raw, provenance()).unwrap();

        assert_eq!(
            serde_json::to_value(&envelope.full_analysis).unwrap(),
            json!({
                "metadata": { "apiVersion": null, "modelId": null, "contentFormat": null },
                "content": null,
                "pages": null,
                "documents": []
            })
        );
    }

    #[test]
    fn test_unrecognized_fields_never_fail_the_build() {
        let raw = RawAnalysisResult::from_value(json!({ "documents": [{ "fields": {
            "VendorName": { "type": "string", "valueString": "Contoso" },
            "FutureField": { "type": "date", "valueDate": "Q3 2024" },
            "FutureFlag": true
        }}]}));
        let envelope = adapter().build(raw, provenance()).unwrap();

        let fields = &envelope.extracted_data.documents[0].fields;
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["VendorName"]);
        assert_eq!(envelope.full_analysis.documents[0]["fields"]["FutureFlag"], json!(true));
    }

    #[test]
    fn test_root_must_be_an_object() {
        let err = adapter()
            .build(RawAnalysisResult::from_value(json!("nope")), provenance())
            .unwrap_err();
        assert_eq!(err, MalformedInputError::NotAnObject { path: "$".into() });
    }

    #[test]
    fn test_malformed_document_reports_its_path() {
        let raw = RawAnalysisResult::from_value(json!({ "documents": [{ "fields": {} }, 7] }));
        let err = adapter().build(raw, provenance()).unwrap_err();
        assert_eq!(err.path(), "documents[1]");
    }

    #[test]
    fn test_system_stamper_generates_fresh_ids() {
        let stamper = SystemStamper;
        assert_ne!(stamper.preap_id(), stamper.preap_id());
    }
}
