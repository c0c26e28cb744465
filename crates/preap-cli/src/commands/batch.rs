//! Batch command - sweep a folder of invoice PDFs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, warn};

use preap_analyzer::DocumentAnalyzer;
use preap_core::Stamper;

use super::config::load_config;
use crate::pipeline::{Analyzer, InvoiceProcessor};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Folder containing invoice PDFs
    #[arg(required = true)]
    input_dir: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "preap_output")]
    output_dir: PathBuf,

    /// Reprocess files whose envelope already exists
    #[arg(long)]
    force: bool,

    /// Also write summary.csv
    #[arg(long)]
    summary_csv: bool,

    /// Use a recorded analysis result instead of the live service
    #[arg(long, value_name = "ANALYSIS_JSON")]
    replay: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Failed,
    Skipped,
}

/// Outcome for one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sweep summary, written to `processing_summary.json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub processed_files: Vec<FileOutcome>,
}

impl BatchSummary {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome.status {
            FileStatus::Success => self.successful += 1,
            FileStatus::Failed => self.failed += 1,
            FileStatus::Skipped => self.skipped += 1,
        }
        self.processed_files.push(outcome);
    }
}

/// Sweep settings.
pub struct SweepOptions<'a> {
    pub output_dir: &'a Path,
    pub skip_existing: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let analyzer = Analyzer::from_config(&config, args.replay.as_deref())?;
    let processor = InvoiceProcessor::new(analyzer);

    let files = list_inputs(&args.input_dir, &config.batch.pattern)?;
    println!(
        "{} Found {} PDF files to process",
        style("ℹ").blue(),
        files.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let options = SweepOptions {
        output_dir: &args.output_dir,
        skip_existing: config.batch.skip_existing && !args.force,
    };
    let summary = sweep(&processor, &files, &options, &pb).await;
    pb.finish_with_message("Complete");

    let summary_path = args.output_dir.join(&config.batch.summary_file);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!(
        "{} Processing summary saved: {}",
        style("✓").green(),
        summary_path.display()
    );

    if args.summary_csv {
        let csv_path = args.output_dir.join("summary.csv");
        write_summary_csv(&csv_path, &summary)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            csv_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        summary.total_files,
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} skipped",
        style(summary.successful).green(),
        style(summary.failed).red(),
        style(summary.skipped).yellow()
    );

    let failed: Vec<_> = summary
        .processed_files
        .iter()
        .filter(|f| f.status == FileStatus::Failed)
        .collect();
    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in failed {
            println!(
                "  - {}: {}",
                outcome.file,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Files in `input_dir` matching `pattern`, sorted by path.
pub fn list_inputs(input_dir: &Path, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        anyhow::bail!("Input folder not found: {}", input_dir.display());
    }

    let full_pattern = input_dir.join(pattern);
    let mut files: Vec<PathBuf> = glob(&full_pattern.to_string_lossy())?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No PDF files found in {}", input_dir.display());
    }
    Ok(files)
}

/// Process `files` one after another. A failing file is recorded and the
/// sweep moves on.
pub async fn sweep<A: DocumentAnalyzer, S: Stamper>(
    processor: &InvoiceProcessor<A, S>,
    files: &[PathBuf],
    options: &SweepOptions<'_>,
    pb: &ProgressBar,
) -> BatchSummary {
    let mut summary = BatchSummary {
        total_files: files.len(),
        ..Default::default()
    };

    for path in files {
        let file = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        pb.set_message(file.clone());

        let outcome = process_one(processor, path, file, options).await;
        summary.record(outcome);
        pb.inc(1);
    }

    summary
}

async fn process_one<A: DocumentAnalyzer, S: Stamper>(
    processor: &InvoiceProcessor<A, S>,
    path: &Path,
    file: String,
    options: &SweepOptions<'_>,
) -> FileOutcome {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");
    let json_output = format!("{stem}.json");
    let json_path = options.output_dir.join(&json_output);

    if options.skip_existing && json_path.exists() {
        debug!("JSON already exists, skipping: {}", json_output);
        return FileOutcome {
            file,
            status: FileStatus::Skipped,
            json_output: Some(json_output),
            vendor: None,
            reason: Some("JSON already exists".to_string()),
            error: None,
        };
    }

    let result = match processor.process_file(path).await {
        Ok(envelope) => envelope
            .save(&json_path)
            .map(|()| envelope)
            .map_err(|e| anyhow::anyhow!("Failed to save JSON file: {e}")),
        Err(e) => Err(e),
    };

    match result {
        Ok(envelope) => FileOutcome {
            file,
            status: FileStatus::Success,
            json_output: Some(json_output),
            vendor: Some(envelope.vendor_name().unwrap_or("N/A").to_string()),
            reason: None,
            error: None,
        },
        Err(e) => {
            let error = format!("{e:#}");
            warn!("Failed to process {}: {}", path.display(), error);
            FileOutcome {
                file,
                status: FileStatus::Failed,
                json_output: None,
                vendor: None,
                reason: None,
                error: Some(error),
            }
        }
    }
}

fn write_summary_csv(path: &Path, summary: &BatchSummary) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["file", "status", "json_output", "vendor", "reason", "error"])?;
    for outcome in &summary.processed_files {
        let status = match outcome.status {
            FileStatus::Success => "success",
            FileStatus::Failed => "failed",
            FileStatus::Skipped => "skipped",
        };
        wtr.write_record([
            outcome.file.as_str(),
            status,
            outcome.json_output.as_deref().unwrap_or(""),
            outcome.vendor.as_deref().unwrap_or(""),
            outcome.reason.as_deref().unwrap_or(""),
            outcome.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
