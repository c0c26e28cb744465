//! Raw document-analysis results and their typed view.
//!
//! The analysis service returns a nested JSON tree (camelCase keys). The
//! tree is kept verbatim for audit passthrough; documents are parsed into
//! [`AnalyzedDocument`] only when an envelope is built.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catalog::FieldKind;
use crate::error::MalformedInputError;

type Result<T> = std::result::Result<T, MalformedInputError>;

/// The service's `analyzeResult` tree, exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnalysisResult {
    tree: Value,
}

impl RawAnalysisResult {
    /// Wrap a bare `analyzeResult` tree.
    pub fn from_value(tree: Value) -> Self {
        Self { tree }
    }

    /// Parse a bare `analyzeResult` tree from JSON text.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::from_value)
    }

    /// Accept either a bare `analyzeResult` or the full operation body
    /// (`{"status": ..., "analyzeResult": {...}}`).
    pub fn from_operation(body: Value) -> Result<Self> {
        match body {
            Value::Object(mut map) if map.contains_key("analyzeResult") => {
                match map.remove("analyzeResult") {
                    Some(tree @ Value::Object(_)) => Ok(Self::from_value(tree)),
                    _ => Err(MalformedInputError::not_an_object("analyzeResult")),
                }
            }
            tree @ Value::Object(_) => Ok(Self::from_value(tree)),
            _ => Err(MalformedInputError::not_an_object("$")),
        }
    }

    /// The underlying tree.
    pub fn as_value(&self) -> &Value {
        &self.tree
    }

    /// Unwrap into the underlying tree.
    pub fn into_value(self) -> Value {
        self.tree
    }

    pub(crate) fn root(&self) -> Result<&Map<String, Value>> {
        self.tree
            .as_object()
            .ok_or_else(|| MalformedInputError::not_an_object("$"))
    }

    /// Raw document instances. Absent or null means none.
    pub(crate) fn documents(&self) -> Result<&[Value]> {
        match self.root()?.get("documents") {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(documents)) => Ok(documents.as_slice()),
            Some(_) => Err(MalformedInputError::not_a_sequence("documents")),
        }
    }

    /// Number of detected documents, without validating them.
    pub fn document_count(&self) -> usize {
        self.tree
            .get("documents")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

/// A detected document instance.
///
/// Field entries stay raw until a catalog entry asks for them, so names
/// outside the catalog are never inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedDocument {
    pub doc_type: Option<String>,
    pub confidence: Option<f64>,
    pub fields: Map<String, Value>,
    pub tables: Vec<TableRecord>,
}

impl AnalyzedDocument {
    pub fn parse(value: &Value, path: &str) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| MalformedInputError::not_an_object(path))?;

        let fields = match obj.get("fields") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(fields)) => fields.clone(),
            Some(_) => return Err(MalformedInputError::not_an_object(format!("{path}.fields"))),
        };

        let tables = match obj.get("tables") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(tables)) => tables
                .iter()
                .enumerate()
                .map(|(i, table)| TableRecord::parse(table, &format!("{path}.tables[{i}]")))
                .collect::<Result<_>>()?,
            Some(_) => return Err(MalformedInputError::not_a_sequence(format!("{path}.tables"))),
        };

        Ok(Self {
            doc_type: optional_string(obj, "docType", path)?,
            confidence: optional_f64(obj, "confidence", path)?,
            fields,
            tables,
        })
    }
}

/// A named, typed, confidence-scored extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentField {
    /// The service's `type` tag, as reported.
    pub type_tag: Option<String>,
    pub confidence: Option<f64>,
    /// Raw text the value was read from.
    pub content: Option<String>,
    pub bounding_regions: Option<Value>,
    pub spans: Option<Value>,
    /// Typed payload; `None` when the service found the field but not its value.
    pub value: Option<FieldValue>,
}

/// Typed payload of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Date(NaiveDate),
    Currency(CurrencyValue),
    /// Structured address, passed through verbatim.
    Address(Map<String, Value>),
    PhoneNumber(String),
    Number(f64),
    Integer(i64),
    Array(Vec<DocumentField>),
    /// Nested field entries, decoded on demand like document fields.
    Object(Map<String, Value>),
}

/// Monetary amount with optional symbol and ISO code.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyValue {
    pub amount: Option<Decimal>,
    pub currency_symbol: Option<String>,
    pub currency_code: Option<String>,
}

impl DocumentField {
    /// Decode the entry `name` of a raw field map. Absent or null entries
    /// are `None`.
    pub fn lookup(
        fields: &Map<String, Value>,
        name: &str,
        declared: Option<FieldKind>,
        path: &str,
    ) -> Result<Option<Self>> {
        match present(fields, name) {
            None => Ok(None),
            Some(field) => Self::parse(field, declared, &format!("{path}.{name}")).map(Some),
        }
    }

    /// Decode one field entry.
    ///
    /// With a `declared` kind, only a payload of that kind is read; a field
    /// reported as anything else keeps its metadata but has no value.
    /// Without one, the payload is read by the reported type.
    pub fn parse(value: &Value, declared: Option<FieldKind>, path: &str) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| MalformedInputError::not_an_object(path))?;

        let type_tag = optional_string(obj, "type", path)?;
        let value = match type_tag.as_deref() {
            Some(tag) if declared.is_none_or(|kind| kind.accepts(tag)) => {
                parse_payload(obj, tag, path)?
            }
            _ => None,
        };

        Ok(Self {
            type_tag,
            confidence: optional_f64(obj, "confidence", path)?,
            content: optional_string(obj, "content", path)?,
            bounding_regions: present(obj, "boundingRegions").cloned(),
            spans: present(obj, "spans").cloned(),
            value,
        })
    }
}

/// Read the payload key belonging to `tag`. Unknown tags carry no payload.
fn parse_payload(obj: &Map<String, Value>, tag: &str, path: &str) -> Result<Option<FieldValue>> {
    let payload = match tag {
        "string" => optional_string(obj, "valueString", path)?.map(FieldValue::String),
        "phoneNumber" => optional_string(obj, "valuePhoneNumber", path)?.map(FieldValue::PhoneNumber),
        "number" => optional_f64(obj, "valueNumber", path)?.map(FieldValue::Number),
        "integer" => match present(obj, "valueInteger") {
            None => None,
            Some(v) => Some(FieldValue::Integer(v.as_i64().ok_or_else(|| {
                MalformedInputError::invalid(format!("{path}.valueInteger"), "expected an integer")
            })?)),
        },
        "date" => match optional_string(obj, "valueDate", path)? {
            None => None,
            Some(raw) => Some(FieldValue::Date(parse_date(&raw).ok_or_else(|| {
                MalformedInputError::invalid(format!("{path}.valueDate"), format!("not a date: {raw}"))
            })?)),
        },
        "currency" => match present(obj, "valueCurrency") {
            None => None,
            Some(v) => Some(FieldValue::Currency(parse_currency(v, &format!("{path}.valueCurrency"))?)),
        },
        "address" => match present(obj, "valueAddress") {
            None => None,
            Some(Value::Object(address)) => Some(FieldValue::Address(address.clone())),
            Some(_) => return Err(MalformedInputError::not_an_object(format!("{path}.valueAddress"))),
        },
        "array" => match present(obj, "valueArray") {
            None => None,
            Some(Value::Array(elements)) => Some(FieldValue::Array(
                elements
                    .iter()
                    .enumerate()
                    .map(|(i, el)| DocumentField::parse(el, None, &format!("{path}.valueArray[{i}]")))
                    .collect::<Result<_>>()?,
            )),
            Some(_) => return Err(MalformedInputError::not_a_sequence(format!("{path}.valueArray"))),
        },
        "object" => match present(obj, "valueObject") {
            None => None,
            Some(Value::Object(nested)) => Some(FieldValue::Object(nested.clone())),
            Some(_) => return Err(MalformedInputError::not_an_object(format!("{path}.valueObject"))),
        },
        _ => None,
    };
    Ok(payload)
}

fn parse_currency(value: &Value, path: &str) -> Result<CurrencyValue> {
    let obj = value
        .as_object()
        .ok_or_else(|| MalformedInputError::not_an_object(path))?;

    let amount = match present(obj, "amount") {
        None => None,
        Some(raw) => Some(parse_amount(raw).ok_or_else(|| {
            MalformedInputError::invalid(format!("{path}.amount"), format!("not an amount: {raw}"))
        })?),
    };

    Ok(CurrencyValue {
        amount,
        currency_symbol: optional_string(obj, "currencySymbol", path)?,
        currency_code: optional_string(obj, "currencyCode", path)?,
    })
}

/// Amounts arrive as JSON numbers, occasionally as strings.
fn parse_amount(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Decimal::from(i));
            }
            n.to_string()
        }
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// A non-null value under `key`.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn optional_string(obj: &Map<String, Value>, key: &str, path: &str) -> Result<Option<String>> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MalformedInputError::invalid(format!("{path}.{key}"), "expected a string")),
    }
}

fn optional_f64(obj: &Map<String, Value>, key: &str, path: &str) -> Result<Option<f64>> {
    match present(obj, key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| MalformedInputError::invalid(format!("{path}.{key}"), "expected a number")),
    }
}

/// A table detected inside a document instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub row_count: u32,
    pub column_count: u32,
    #[serde(default)]
    pub cells: Vec<TableCellRecord>,
}

/// A single table cell, in the service's order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCellRecord {
    pub row_index: u32,
    pub column_index: u32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub bounding_regions: Option<Value>,
    #[serde(default)]
    pub spans: Option<Value>,
}

impl TableRecord {
    fn parse(value: &Value, path: &str) -> Result<Self> {
        if !value.is_object() {
            return Err(MalformedInputError::not_an_object(path));
        }
        TableRecord::deserialize(value).map_err(|e| MalformedInputError::invalid(path, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_operation_unwraps_analyze_result() {
        let body = json!({
            "status": "succeeded",
            "analyzeResult": { "apiVersion": "2024-11-30", "documents": [] }
        });
        let raw = RawAnalysisResult::from_operation(body).unwrap();
        assert_eq!(raw.as_value()["apiVersion"], "2024-11-30");

        let bare = RawAnalysisResult::from_operation(json!({ "modelId": "prebuilt-invoice" })).unwrap();
        assert_eq!(bare.as_value()["modelId"], "prebuilt-invoice");

        assert!(RawAnalysisResult::from_operation(json!([1, 2])).is_err());
    }

    #[test]
    fn test_documents_must_be_a_sequence() {
        let raw = RawAnalysisResult::from_value(json!({ "documents": { "0": {} } }));
        assert_eq!(
            raw.documents().unwrap_err(),
            MalformedInputError::NotASequence { path: "documents".into() }
        );

        let raw = RawAnalysisResult::from_value(json!({ "content": "" }));
        assert!(raw.documents().unwrap().is_empty());
    }

    #[test]
    fn test_parse_currency_field() {
        let field = DocumentField::parse(
            &json!({
                "type": "currency",
                "valueCurrency": { "amount": 1234.5, "currencySymbol": "$", "currencyCode": "USD" },
                "content": "$1,234.50",
                "confidence": 0.97
            }),
            Some(FieldKind::Currency),
            "f",
        )
        .unwrap();

        assert_eq!(field.confidence, Some(0.97));
        assert_eq!(
            field.value,
            Some(FieldValue::Currency(CurrencyValue {
                amount: Some(Decimal::from_str("1234.5").unwrap()),
                currency_symbol: Some("$".into()),
                currency_code: Some("USD".into()),
            }))
        );
    }

    #[test]
    fn test_missing_payload_is_none() {
        let field = DocumentField::parse(
            &json!({ "type": "currency", "content": "USD ???", "confidence": 0.4 }),
            Some(FieldKind::Currency),
            "f",
        )
        .unwrap();
        assert_eq!(field.value, None);
        assert_eq!(field.content.as_deref(), Some("USD ???"));
    }

    #[test]
    fn test_unknown_type_carries_no_payload() {
        let field = DocumentField::parse(
            &json!({ "type": "selectionMark", "valueSelectionMark": "selected" }),
            None,
            "f",
        )
        .unwrap();
        assert_eq!(field.type_tag.as_deref(), Some("selectionMark"));
        assert_eq!(field.value, None);
    }

    #[test]
    fn test_invalid_date_is_malformed() {
        let err = DocumentField::parse(
            &json!({ "type": "date", "valueDate": "yesterday" }),
            Some(FieldKind::Date),
            "doc.InvoiceDate",
        )
        .unwrap_err();
        assert_eq!(err.path(), "doc.InvoiceDate.valueDate");
    }

    #[test]
    fn test_other_reported_type_is_not_decoded() {
        // PaymentTerms is declared as a string; the date payload is never read.
        let field = DocumentField::parse(
            &json!({ "type": "date", "valueDate": "net 30", "content": "Net 30", "confidence": 0.5 }),
            Some(FieldKind::String),
            "doc.PaymentTerms",
        )
        .unwrap();
        assert_eq!(field.value, None);
        assert_eq!(field.content.as_deref(), Some("Net 30"));
        assert_eq!(field.confidence, Some(0.5));
    }

    #[test]
    fn test_lookup_ignores_other_entries() {
        let fields = json!({
            "VendorName": { "type": "string", "valueString": "Contoso" },
            "FutureFlag": true,
            "FutureField": { "type": "date", "valueDate": "Q3 2024" },
            "Blank": null
        });
        let fields = fields.as_object().unwrap();

        let vendor = DocumentField::lookup(fields, "VendorName", Some(FieldKind::String), "doc")
            .unwrap()
            .unwrap();
        assert_eq!(vendor.value, Some(FieldValue::String("Contoso".into())));
        assert_eq!(DocumentField::lookup(fields, "Blank", Some(FieldKind::String), "doc").unwrap(), None);
        assert_eq!(DocumentField::lookup(fields, "Missing", None, "doc").unwrap(), None);

        let err = DocumentField::lookup(fields, "FutureFlag", None, "doc").unwrap_err();
        assert_eq!(err.path(), "doc.FutureFlag");
    }

    #[test]
    fn test_parse_amount_forms() {
        assert_eq!(parse_amount(&json!(10)), Some(Decimal::from(10)));
        assert_eq!(parse_amount(&json!("99.95")), Decimal::from_str("99.95").ok());
        assert_eq!(parse_amount(&json!(true)), None);
    }

    #[test]
    fn test_parse_document_keeps_fields_raw() {
        let doc = AnalyzedDocument::parse(
            &json!({
                "docType": "invoice",
                "confidence": 1.0,
                "fields": {
                    "Items": {
                        "type": "array",
                        "valueArray": [
                            { "type": "object", "valueObject": {
                                "Description": { "type": "string", "valueString": "Widget" },
                                "Weight": { "type": "number", "valueNumber": "12 kg" }
                            }}
                        ]
                    },
                    "Unparsed": 42
                },
                "tables": [
                    { "rowCount": 1, "columnCount": 2, "cells": [
                        { "rowIndex": 0, "columnIndex": 0, "content": "Qty" },
                        { "rowIndex": 0, "columnIndex": 1, "content": "Price" }
                    ]}
                ]
            }),
            "documents[0]",
        )
        .unwrap();

        assert_eq!(doc.doc_type.as_deref(), Some("invoice"));
        assert_eq!(doc.fields.len(), 2);
        assert_eq!(doc.tables[0].cells[1].content, "Price");

        let items = DocumentField::lookup(&doc.fields, "Items", Some(FieldKind::ObjectArray), "documents[0]")
            .unwrap()
            .unwrap();
        assert!(matches!(items.value, Some(FieldValue::Array(ref els)) if els.len() == 1));
    }

    #[test]
    fn test_fields_must_be_a_mapping() {
        let err = AnalyzedDocument::parse(&json!({ "fields": [] }), "documents[0]").unwrap_err();
        assert_eq!(err.path(), "documents[0].fields");
    }
}
