//! Catalog-driven field, line-item and table extraction.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::catalog::{FieldSpec, Placement};
use crate::error::MalformedInputError;
use crate::models::analysis::{DocumentField, FieldValue, TableRecord};
use crate::models::envelope::{
    ExtractedCell, ExtractedFieldValue, ExtractedItem, ExtractedTable, ResolvedValue,
};

type Result<T> = std::result::Result<T, MalformedInputError>;

/// Extract every catalog entry placed under `fields` that is present in
/// `fields`. Names outside the catalog are never read.
pub fn extract_fields(
    fields: &Map<String, Value>,
    catalog: &[FieldSpec],
    path: &str,
) -> Result<IndexMap<String, ExtractedFieldValue>> {
    let mut extracted = IndexMap::new();
    for spec in catalog.iter().filter(|spec| spec.placement == Placement::Fields) {
        if let Some(field) = DocumentField::lookup(fields, spec.name, Some(spec.kind), path)? {
            let resolved = resolve(&field, &format!("{path}.{}", spec.name))?;
            extracted.insert(spec.name.to_string(), resolved);
        }
    }
    Ok(extracted)
}

/// Extract line items from every array entry placed under `items`, each
/// element projected through `item_catalog`.
pub fn extract_items(
    fields: &Map<String, Value>,
    catalog: &[FieldSpec],
    item_catalog: &[FieldSpec],
    path: &str,
) -> Result<Vec<ExtractedItem>> {
    let mut items = Vec::new();
    for spec in catalog.iter().filter(|spec| spec.placement == Placement::LineItems) {
        let Some(field) = DocumentField::lookup(fields, spec.name, Some(spec.kind), path)? else {
            continue;
        };
        let Some(FieldValue::Array(elements)) = &field.value else {
            continue;
        };

        for (idx, element) in elements.iter().enumerate() {
            let fields = match &element.value {
                Some(FieldValue::Object(nested)) => {
                    let element_path = format!("{path}.{}.valueArray[{idx}].valueObject", spec.name);
                    extract_fields(nested, item_catalog, &element_path)?
                }
                _ => IndexMap::new(),
            };
            items.push(ExtractedItem {
                item_number: items.len() + 1,
                fields,
            });
        }
    }
    Ok(items)
}

/// Tables in input order, cells in input order.
pub fn extract_tables(tables: &[TableRecord]) -> Vec<ExtractedTable> {
    tables
        .iter()
        .enumerate()
        .map(|(idx, table)| ExtractedTable {
            table_number: idx + 1,
            row_count: table.row_count,
            column_count: table.column_count,
            cells: table
                .cells
                .iter()
                .map(|cell| ExtractedCell {
                    row_index: cell.row_index,
                    column_index: cell.column_index,
                    content: cell.content.clone(),
                    bounding_regions: cell.bounding_regions.clone(),
                    spans: cell.spans.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Project a decoded field. Nested entries of arrays and objects have no
/// catalog and resolve by their own reported type.
fn resolve(field: &DocumentField, path: &str) -> Result<ExtractedFieldValue> {
    let mut extracted = ExtractedFieldValue {
        confidence: field.confidence,
        content: field.content.clone(),
        bounding_regions: field.bounding_regions.clone(),
        spans: field.spans.clone(),
        ..Default::default()
    };

    extracted.value = match &field.value {
        None => None,
        Some(FieldValue::String(text) | FieldValue::PhoneNumber(text)) => {
            Some(ResolvedValue::Text(text.clone()))
        }
        Some(FieldValue::Date(date)) => Some(ResolvedValue::Date(*date)),
        Some(FieldValue::Currency(currency)) => {
            extracted.currency = currency.currency_symbol.clone();
            extracted.currency_code = currency.currency_code.clone();
            currency.amount.map(ResolvedValue::Amount)
        }
        Some(FieldValue::Address(address)) => Some(ResolvedValue::Address(address.clone())),
        Some(FieldValue::Number(n)) => Some(ResolvedValue::Number(*n)),
        Some(FieldValue::Integer(n)) => Some(ResolvedValue::Integer(*n)),
        Some(FieldValue::Array(elements)) => Some(ResolvedValue::List(
            elements
                .iter()
                .enumerate()
                .map(|(i, element)| resolve(element, &format!("{path}.valueArray[{i}]")))
                .collect::<Result<_>>()?,
        )),
        Some(FieldValue::Object(nested)) => {
            let nested_path = format!("{path}.valueObject");
            let mut resolved = IndexMap::with_capacity(nested.len());
            for name in nested.keys() {
                if let Some(field) = DocumentField::lookup(nested, name, None, &nested_path)? {
                    resolved.insert(name.clone(), resolve(&field, &format!("{nested_path}.{name}"))?);
                }
            }
            Some(ResolvedValue::Object(resolved))
        }
    };
    Ok(extracted)
}
