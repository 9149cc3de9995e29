//! Process command: run the pipeline on a single PDF document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use lsgb_core::models::manifest::ManifestRow;
use lsgb_core::pipeline::DocumentReport;

use super::{Mode, build_pipeline, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Extraction mode
    #[arg(short, long, value_enum, default_value = "receipt")]
    mode: Mode,

    /// OCR model directory
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Skip the OCR fallback and use only embedded PDF text
    #[arg(long)]
    text_only: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Full report as JSON
    Json,
    /// Manifest rows as CSV
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "pdf" {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    pb.set_message("Loading pipeline...");
    pb.set_position(10);
    let pipeline = build_pipeline(config, args.model_dir.as_ref(), args.text_only);

    pb.set_message("Processing document...");
    pb.set_position(40);
    let report = pipeline.process_file(&args.input, args.mode.into())?;

    pb.set_position(90);
    pb.finish_with_message("Done");

    let output = format_report(&report, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_report(report: &DocumentReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_csv(&report.manifest_rows()),
        OutputFormat::Text => Ok(format_text(report)),
    }
}

pub fn format_csv(rows: &[ManifestRow]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(ManifestRow::HEADERS)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &DocumentReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("Document: {}\n", report.input));
    output.push_str(&format!("Pages: {}\n", report.total_pages));
    if report.digitally_signed {
        output.push_str("Digitally signed: yes\n");
    }
    if !report.ocr_pages.is_empty() {
        output.push_str(&format!("OCR pages: {}\n", report.ocr_pages.len()));
    }
    output.push('\n');

    if let Some(delivery) = &report.delivery {
        output.push_str("Accepted delivery-note numbers:\n");
        for value in &delivery.accepted {
            output.push_str(&format!("  {}\n", value));
        }
        if !delivery.auto_corrections.is_empty() {
            output.push_str("\nAuto-corrections:\n");
            for correction in &delivery.auto_corrections {
                output.push_str(&format!(
                    "  {} -> {} ({})\n",
                    correction.original, correction.corrected, correction.reason
                ));
            }
        }
        if !delivery.excluded.is_empty() {
            output.push_str("\nExcluded:\n");
            for excluded in &delivery.excluded {
                output.push_str(&format!("  {} ({})\n", excluded.value, excluded.reason));
            }
        }
        if !delivery.invalid.is_empty() {
            output.push_str("\nInvalid:\n");
            for invalid in &delivery.invalid {
                output.push_str(&format!("  {} ({})\n", invalid.value, invalid.reason));
            }
        }
        if !delivery.duplicates.is_empty() {
            output.push_str("\nDuplicates:\n");
            for duplicate in &delivery.duplicates {
                output.push_str(&format!(
                    "  {} x{} ({})\n",
                    duplicate.value, duplicate.count, duplicate.reason
                ));
            }
        }
    }

    if !report.groups.is_empty() {
        output.push_str("Identifier groups:\n");
        for group in &report.groups {
            output.push_str(&format!(
                "  {} [{}] pages {} - {}\n",
                group.identifier.as_deref().unwrap_or("?"),
                group.id_type,
                group.pages,
                group.notes
            ));
        }
    }
    if !report.dropped_pages.is_empty() {
        output.push_str(&format!(
            "\nDropped pages (no identifier): {:?}\n",
            report.dropped_pages
        ));
    }

    output
}
