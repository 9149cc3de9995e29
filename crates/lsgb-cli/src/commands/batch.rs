//! Batch command: process many PDFs with a bounded worker pool and write a
//! cross-document manifest.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use lsgb_core::models::manifest::ManifestRow;
use lsgb_core::pipeline::{DocumentPipeline, PipelineMode};

use super::{Mode, build_pipeline, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory for per-document reports and the manifest
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Extraction mode
    #[arg(short, long, value_enum, default_value = "receipt")]
    mode: Mode,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// OCR model directory
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Skip the OCR fallback and use only embedded PDF text
    #[arg(long)]
    text_only: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching PDF files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let pipeline = Arc::new(build_pipeline(config, args.model_dir.as_ref(), args.text_only));
    let mode: PipelineMode = args.mode.into();
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let mut tasks = JoinSet::new();
    for path in files {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        let output_dir = args.output_dir.clone();

        tasks.spawn(async move {
            // Closing the semaphore aborts the batch; treat as cancelled.
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Vec::new(),
            };
            let display = path.display().to_string();
            tokio::task::spawn_blocking(move || process_one(&pipeline, &path, mode, &output_dir))
                .await
                .unwrap_or_else(|e| {
                    vec![ManifestRow::error(&display, &format!("worker panicked: {}", e))]
                })
        });
    }

    let mut rows: Vec<ManifestRow> = Vec::new();
    let mut interrupted = false;

    loop {
        tokio::select! {
            joined = tasks.join_next() => {
                match joined {
                    Some(Ok(mut task_rows)) => {
                        rows.append(&mut task_rows);
                        pb.inc(1);
                    }
                    Some(Err(e)) => {
                        warn!("batch task failed: {}", e);
                        pb.inc(1);
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                eprintln!("\n{} Interrupted, writing partial manifest...", style("!").yellow());
                interrupted = true;
                semaphore.close();
                tasks.abort_all();
            }
        }
    }

    pb.finish_with_message("Complete");

    // The manifest is written even on partial or failed runs.
    rows.sort_by(|a, b| a.input.cmp(&b.input).then(a.pages.cmp(&b.pages)));
    let manifest_path = args.output_dir.join("manifest.csv");
    write_manifest(&manifest_path, &rows)?;

    let ok = rows
        .iter()
        .filter(|r| r.status != lsgb_core::models::manifest::DocumentStatus::Error)
        .count();
    let failed = rows.len() - ok;

    println!();
    println!(
        "{} Processed {} rows in {:?} (finished {})",
        style("✓").green(),
        rows.len(),
        start.elapsed(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "   {} ok, {} failed",
        style(ok).green(),
        style(failed).red()
    );
    println!(
        "{} Manifest written to {}",
        style("✓").green(),
        manifest_path.display()
    );

    if interrupted {
        anyhow::bail!("batch interrupted");
    }

    Ok(())
}

/// Process one document, write its JSON report, and return its manifest
/// rows. Failures become an `ERROR` row instead of aborting the batch.
fn process_one(
    pipeline: &DocumentPipeline,
    path: &PathBuf,
    mode: PipelineMode,
    output_dir: &PathBuf,
) -> Vec<ManifestRow> {
    let input = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match pipeline.process_file(path, mode) {
        Ok(report) => {
            let mut rows = report.manifest_rows();

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document");

            // Digitally signed documents are passed through unmodified so
            // the signature stays valid.
            if report.digitally_signed {
                let copy_path = output_dir.join(&input);
                if let Err(e) = fs::copy(path, &copy_path) {
                    warn!("failed to copy signed document {}: {}", path.display(), e);
                } else {
                    let name = copy_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned());
                    for row in &mut rows {
                        row.output_file = name.clone();
                    }
                }
            }
            let report_path = output_dir.join(format!("{}.json", stem));
            match serde_json::to_string_pretty(&report) {
                Ok(json) => {
                    if let Err(e) = fs::write(&report_path, json) {
                        warn!("failed to write report {}: {}", report_path.display(), e);
                    } else {
                        debug!("wrote report to {}", report_path.display());
                        let name = report_path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned());
                        for row in &mut rows {
                            if row.output_file.is_none() {
                                row.output_file = name.clone();
                            }
                        }
                    }
                }
                Err(e) => warn!("failed to serialize report for {}: {}", input, e),
            }

            rows
        }
        Err(e) => {
            warn!("failed to process {}: {}", path.display(), e);
            vec![ManifestRow::error(&input, &e.to_string())]
        }
    }
}

fn write_manifest(path: &PathBuf, rows: &[ManifestRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(ManifestRow::HEADERS)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}
