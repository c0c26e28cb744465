//! The PREAP envelope: versioned, normalized output for one analysis.
//!
//! Key names are part of the persisted contract. Absent values are never
//! serialized as `null`; the key is omitted instead.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Result;

/// Envelope format version.
pub const PREAP_VERSION: &str = "1.0";

/// Caller-supplied metadata about the input's origin.
pub type Provenance = IndexMap<String, String>;

/// Top-level output for one analyzed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreapEnvelope {
    pub preap_version: String,
    pub preap_id: Uuid,
    /// Build time (UTC).
    pub timestamp: DateTime<Utc>,
    pub source: Provenance,
    pub extracted_data: ExtractedData,
    pub full_analysis: FullAnalysis,
}

/// Normalized extraction, one entry per detected document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedData {
    pub documents: Vec<ExtractedDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedDocument {
    /// 1-based position in the analysis result.
    pub document_number: usize,
    pub fields: IndexMap<String, ExtractedFieldValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ExtractedItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<ExtractedTable>,
}

/// A single normalized field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedFieldValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ResolvedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_regions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spans: Option<Value>,
    /// Currency symbol (currency fields only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// ISO 4217 code (currency fields only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

/// A field value after kind resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    Text(String),
    Date(NaiveDate),
    Amount(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] Decimal),
    Number(f64),
    Integer(i64),
    Address(Map<String, Value>),
    List(Vec<ExtractedFieldValue>),
    Object(IndexMap<String, ExtractedFieldValue>),
}

impl ResolvedValue {
    /// Text payload, if this is a string-like value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResolvedValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// One line item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedItem {
    /// 1-based position in the line-item array.
    pub item_number: usize,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, ExtractedFieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedTable {
    /// 1-based position in the document's tables.
    pub table_number: usize,
    pub row_count: u32,
    pub column_count: u32,
    pub cells: Vec<ExtractedCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedCell {
    pub row_index: u32,
    pub column_index: u32,
    pub content: String,
    /// Always emitted, `null` when the service gave none.
    pub bounding_regions: Option<Value>,
    pub spans: Option<Value>,
}

/// Verbatim copy of the analysis result, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullAnalysis {
    pub metadata: AnalysisMetadata,
    pub content: Value,
    pub pages: Value,
    pub documents: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub api_version: Value,
    pub model_id: Value,
    pub content_format: Value,
}

impl PreapEnvelope {
    /// Serialize to JSON text.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Write the envelope as pretty-printed UTF-8 JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json(true)?)?;
        Ok(())
    }

    /// `VendorName` of the first document, when it resolved to text.
    pub fn vendor_name(&self) -> Option<&str> {
        self.extracted_data
            .documents
            .first()?
            .fields
            .get("VendorName")?
            .value
            .as_ref()?
            .as_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_absent_keys_are_omitted() {
        let field = ExtractedFieldValue {
            confidence: Some(0.5),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&field).unwrap(), json!({ "confidence": 0.5 }));
    }

    #[test]
    fn test_amount_serializes_as_number() {
        let field = ExtractedFieldValue {
            value: Some(ResolvedValue::Amount(Decimal::from_str("1234.50").unwrap())),
            currency: Some("$".into()),
            currency_code: Some("USD".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&field).unwrap(),
            json!({ "value": 1234.5, "currency": "$", "currency_code": "USD" })
        );
    }

    #[test]
    fn test_date_serializes_as_iso() {
        let value = ResolvedValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(serde_json::to_value(&value).unwrap(), json!("2024-03-01"));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let doc = ExtractedDocument {
            document_number: 1,
            fields: IndexMap::new(),
            items: Vec::new(),
            tables: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({ "document_number": 1, "fields": {} })
        );

        let item = ExtractedItem {
            item_number: 2,
            fields: IndexMap::new(),
        };
        assert_eq!(serde_json::to_value(&item).unwrap(), json!({ "item_number": 2 }));
    }
}
