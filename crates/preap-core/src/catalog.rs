//! Static catalog of recognized invoice fields.
//!
//! Names must match the prebuilt invoice model's vocabulary exactly
//! (case-sensitive). Catalog order is the output key order.

use serde::Serialize;

/// Value kind a catalog entry expects to find in a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Date,
    Currency,
    Address,
    PhoneNumber,
    Number,
    /// Ordered sequence of nested field mappings.
    ObjectArray,
}

impl FieldKind {
    /// The analysis service's `type` tag for this kind.
    pub fn type_tag(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Date => "date",
            FieldKind::Currency => "currency",
            FieldKind::Address => "address",
            FieldKind::PhoneNumber => "phoneNumber",
            FieldKind::Number => "number",
            FieldKind::ObjectArray => "array",
        }
    }

    /// Whether a field reported as `tag` holds a payload of this kind.
    pub fn accepts(&self, tag: &str) -> bool {
        match self {
            FieldKind::Number => matches!(tag, "number" | "integer"),
            kind => kind.type_tag() == tag,
        }
    }
}

/// Where an extracted field ends up in the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Emitted under `fields`.
    Fields,
    /// Each array element becomes an entry under `items`.
    LineItems,
}

/// A single catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub placement: Placement,
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            placement: Placement::Fields,
        }
    }

    const fn line_items(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::ObjectArray,
            placement: Placement::LineItems,
        }
    }
}

use FieldKind as K;

static DOCUMENT_FIELDS: &[FieldSpec] = &[
    // Vendor
    FieldSpec::new("VendorName", K::String),
    FieldSpec::new("VendorAddress", K::Address),
    FieldSpec::new("VendorAddressRecipient", K::String),
    FieldSpec::new("VendorTaxId", K::String),
    FieldSpec::new("VendorPhoneNumber", K::PhoneNumber),
    FieldSpec::new("VendorEmail", K::String),
    FieldSpec::new("VendorWebsite", K::String),
    // Customer
    FieldSpec::new("CustomerName", K::String),
    FieldSpec::new("CustomerAddress", K::Address),
    FieldSpec::new("CustomerAddressRecipient", K::String),
    FieldSpec::new("CustomerId", K::String),
    FieldSpec::new("CustomerTaxId", K::String),
    FieldSpec::new("CustomerPhoneNumber", K::PhoneNumber),
    FieldSpec::new("CustomerEmail", K::String),
    // Identification
    FieldSpec::new("InvoiceId", K::String),
    FieldSpec::new("InvoiceDate", K::Date),
    FieldSpec::new("InvoiceTotal", K::Currency),
    FieldSpec::new("DueDate", K::Date),
    FieldSpec::new("PurchaseOrder", K::String),
    FieldSpec::new("SalesOrder", K::String),
    FieldSpec::new("ServiceOrder", K::String),
    FieldSpec::new("Contract", K::String),
    FieldSpec::new("Project", K::String),
    // Addresses
    FieldSpec::new("BillingAddress", K::Address),
    FieldSpec::new("BillingAddressRecipient", K::String),
    FieldSpec::new("ShippingAddress", K::Address),
    FieldSpec::new("ShippingAddressRecipient", K::String),
    FieldSpec::new("ServiceAddress", K::Address),
    FieldSpec::new("ServiceAddressRecipient", K::String),
    FieldSpec::new("RemittanceAddress", K::Address),
    FieldSpec::new("RemittanceAddressRecipient", K::String),
    // Amounts
    FieldSpec::new("SubTotal", K::Currency),
    FieldSpec::new("TotalTax", K::Currency),
    FieldSpec::new("PreviousUnpaidBalance", K::Currency),
    FieldSpec::new("AmountDue", K::Currency),
    FieldSpec::new("Discount", K::Currency),
    FieldSpec::new("DiscountDate", K::Date),
    FieldSpec::new("TaxDetails", K::ObjectArray),
    FieldSpec::new("PaymentTerms", K::String),
    FieldSpec::new("PaymentMethod", K::String),
    // Service period
    FieldSpec::new("ServiceStartDate", K::Date),
    FieldSpec::new("ServiceEndDate", K::Date),
    // Bank
    FieldSpec::new("BankName", K::String),
    FieldSpec::new("BankBranch", K::String),
    FieldSpec::new("BankAccountNumber", K::String),
    FieldSpec::new("BankRoutingNumber", K::String),
    FieldSpec::new("BankIban", K::String),
    FieldSpec::new("BankSwift", K::String),
    // Other
    FieldSpec::new("ReceiptNumber", K::String),
    FieldSpec::new("ReceiptDate", K::Date),
    FieldSpec::new("Currency", K::String),
    FieldSpec::new("ExchangeRate", K::Number),
    FieldSpec::new("Note", K::String),
    FieldSpec::new("ReferenceNumber", K::String),
    FieldSpec::new("AttentionTo", K::String),
    FieldSpec::new("CompanyTaxId", K::String),
    FieldSpec::new("LicenseNumber", K::String),
    FieldSpec::new("VatId", K::String),
    FieldSpec::line_items("Items"),
];

static ITEM_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("Description", K::String),
    FieldSpec::new("Quantity", K::Number),
    FieldSpec::new("Unit", K::String),
    FieldSpec::new("UnitPrice", K::Currency),
    FieldSpec::new("ProductCode", K::String),
    FieldSpec::new("Date", K::Date),
    FieldSpec::new("Tax", K::String),
    FieldSpec::new("TaxRate", K::Number),
    FieldSpec::new("TaxAmount", K::Currency),
    FieldSpec::new("Amount", K::Currency),
    FieldSpec::new("Discount", K::Currency),
    FieldSpec::new("DiscountRate", K::Number),
    FieldSpec::new("Code", K::String),
    FieldSpec::new("CommodityCode", K::String),
    FieldSpec::new("Measure", K::String),
    FieldSpec::new("BaseAmount", K::Currency),
    FieldSpec::new("Deposit", K::Currency),
    FieldSpec::new("Total", K::Currency),
];

/// Document-level invoice fields, in output order.
pub fn document_fields() -> &'static [FieldSpec] {
    DOCUMENT_FIELDS
}

/// Line-item fields, in output order.
pub fn item_fields() -> &'static [FieldSpec] {
    ITEM_FIELDS
}

/// Names of every recognized document-level field.
pub fn recognized_fields() -> Vec<&'static str> {
    DOCUMENT_FIELDS.iter().map(|spec| spec.name).collect()
}

/// Names of every recognized line-item field.
pub fn recognized_item_fields() -> Vec<&'static str> {
    ITEM_FIELDS.iter().map(|spec| spec.name).collect()
}

/// Find an entry of `catalog` by exact name.
pub fn lookup(catalog: &'static [FieldSpec], name: &str) -> Option<&'static FieldSpec> {
    catalog.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_unique(specs: &[FieldSpec]) {
        let mut seen = HashSet::new();
        for spec in specs {
            assert!(seen.insert(spec.name), "duplicate catalog entry: {}", spec.name);
        }
    }

    #[test]
    fn test_catalogs_have_no_duplicates() {
        assert_unique(document_fields());
        assert_unique(item_fields());
    }

    #[test]
    fn test_items_is_the_only_line_item_entry() {
        let line_items: Vec<_> = document_fields()
            .iter()
            .filter(|spec| spec.placement == Placement::LineItems)
            .collect();
        assert_eq!(line_items.len(), 1);
        assert_eq!(line_items[0].name, "Items");
        assert_eq!(line_items[0].kind, FieldKind::ObjectArray);

        assert!(item_fields().iter().all(|spec| spec.placement == Placement::Fields));
    }

    #[test]
    fn test_catalog_order_is_preserved() {
        let names = recognized_fields();
        assert_eq!(names.first(), Some(&"VendorName"));
        assert_eq!(names.last(), Some(&"Items"));

        let items = recognized_item_fields();
        assert_eq!(items.len(), 18);
        assert_eq!(items[0], "Description");
        assert_eq!(items[17], "Total");
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let fields = document_fields();
        assert_eq!(lookup(fields, "InvoiceTotal").map(|s| s.kind), Some(FieldKind::Currency));
        assert!(lookup(fields, "invoicetotal").is_none());
        assert!(lookup(fields, "NotAField").is_none());
        assert_eq!(lookup(item_fields(), "Quantity").map(|s| s.kind), Some(FieldKind::Number));
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(FieldKind::PhoneNumber.type_tag(), "phoneNumber");
        assert_eq!(FieldKind::ObjectArray.type_tag(), "array");
    }

    #[test]
    fn test_kind_accepts_reported_tags() {
        assert!(FieldKind::Number.accepts("integer"));
        assert!(FieldKind::Number.accepts("number"));
        assert!(FieldKind::Date.accepts("date"));
        assert!(!FieldKind::String.accepts("date"));
        assert!(!FieldKind::ObjectArray.accepts("object"));
    }
}
