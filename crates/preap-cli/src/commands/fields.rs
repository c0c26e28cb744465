//! Fields command - list the recognized field catalog.

use clap::Args;
use serde::Serialize;

use anyhow::anyhow;

use preap_core::catalog::{document_fields, item_fields, lookup};
use preap_core::{FieldSpec, Placement};

/// Arguments for the fields command.
#[derive(Args)]
pub struct FieldsArgs {
    /// Show a single entry by exact (case-sensitive) name
    name: Option<String>,

    /// List line-item fields instead of document fields
    #[arg(long)]
    items: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// One name per line
    Text,
    /// JSON array of entries
    Json,
    /// CSV with name, kind, placement
    Csv,
}

#[derive(Serialize)]
struct FieldRow {
    name: &'static str,
    kind: &'static str,
    placement: &'static str,
}

impl From<&FieldSpec> for FieldRow {
    fn from(spec: &FieldSpec) -> Self {
        Self {
            name: spec.name,
            kind: spec.kind.type_tag(),
            placement: match spec.placement {
                Placement::Fields => "fields",
                Placement::LineItems => "items",
            },
        }
    }
}

pub async fn run(args: FieldsArgs) -> anyhow::Result<()> {
    let catalog = if args.items { item_fields() } else { document_fields() };
    let selected = select(catalog, args.name.as_deref())?;
    print!("{}", render(selected, args.format)?);
    Ok(())
}

fn select(catalog: &'static [FieldSpec], name: Option<&str>) -> anyhow::Result<&'static [FieldSpec]> {
    match name {
        None => Ok(catalog),
        Some(name) => lookup(catalog, name)
            .map(std::slice::from_ref)
            .ok_or_else(|| anyhow!("Unknown field: {name}")),
    }
}

fn render(catalog: &[FieldSpec], format: OutputFormat) -> anyhow::Result<String> {
    let rows: Vec<FieldRow> = catalog.iter().map(FieldRow::from).collect();

    let output = match format {
        OutputFormat::Text => rows.iter().map(|r| format!("{}\n", r.name)).collect(),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            for row in &rows {
                wtr.serialize(row)?;
            }
            String::from_utf8(wtr.into_inner()?)?
        }
    };
    Ok(output)
}
