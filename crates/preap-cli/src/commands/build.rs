//! Build command - run the result adapter on a saved analysis result.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;

use preap_core::{Provenance, RawAnalysisResult, ResultAdapter};

use super::config::load_config;

/// Arguments for the build command.
#[derive(Args)]
pub struct BuildArgs {
    /// Saved analysis result (bare `analyzeResult` or full operation body)
    #[arg(required = true)]
    input: PathBuf,

    /// Provenance entry, repeatable
    #[arg(short, long = "source", value_name = "KEY=VALUE", value_parser = parse_source)]
    sources: Vec<(String, String)>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,
}

fn parse_source(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

pub async fn run(args: BuildArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let body: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", args.input.display()))?;
    let raw = RawAnalysisResult::from_operation(body)?;

    let provenance: Provenance = args.sources.into_iter().collect();
    let envelope = ResultAdapter::new().build(raw, provenance)?;

    match &args.output {
        Some(output_path) => {
            envelope.save(output_path)?;
            eprintln!(
                "{} Output written to {}",
                style("✓").green(),
                output_path.display()
            );
        }
        None => println!("{}", envelope.to_json(config.output.pretty && !args.compact)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert_eq!(
            parse_source("file_name=a=b.pdf").unwrap(),
            ("file_name".to_string(), "a=b.pdf".to_string())
        );
        assert!(parse_source("no-separator").is_err());
        assert!(parse_source("=value").is_err());
    }
}
