//! Process command - build the envelope for a single invoice file.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::config::load_config;
use crate::pipeline::{Analyzer, InvoiceProcessor};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,

    /// Use a recorded analysis result instead of the live service
    #[arg(long, value_name = "ANALYSIS_JSON")]
    replay: Option<PathBuf>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let analyzer = Analyzer::from_config(&config, args.replay.as_deref())?;
    let processor = InvoiceProcessor::new(analyzer);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(format!("Analyzing {}", args.input.display()));
    pb.enable_steady_tick(std::time::Duration::from_millis(120));

    let result = processor.process_file(&args.input).await;
    pb.finish_and_clear();
    let envelope = result?;

    info!(
        "Built envelope {} in {:?}",
        envelope.preap_id,
        start.elapsed()
    );

    match &args.output {
        Some(output_path) => {
            envelope.save(output_path)?;
            eprintln!(
                "{} Output written to {}",
                style("✓").green(),
                output_path.display()
            );
        }
        None => {
            let pretty = config.output.pretty && !args.compact;
            println!("{}", envelope.to_json(pretty)?);
        }
    }

    if let Some(vendor) = envelope.vendor_name() {
        eprintln!("{} Vendor: {}", style("ℹ").blue(), vendor);
    }

    Ok(())
}
