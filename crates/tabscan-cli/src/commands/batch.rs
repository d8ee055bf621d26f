//! Batch processing command for multiple detections files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use tabscan_core::{CollectingDiagnostics, PipelineReport, TablePipeline, TracingDiagnostics};

use super::process::{apply_overrides, run_request};
use super::{load_config, EngineChoice};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of detections files
    #[arg(required = true)]
    input: String,

    /// Engine that produced the detections (paddle, easyocr, tesseract)
    #[arg(short, long)]
    engine: EngineChoice,

    /// Extension of source images next to each detections file
    #[arg(long)]
    image_ext: Option<String>,

    /// Output directory
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Maximum vertical distance in pixels from a row's first detection
    #[arg(long)]
    y_threshold: Option<f32>,

    /// Green tier lower bound in percent
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    green: Option<u8>,

    /// Yellow tier lower bound in percent
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    yellow: Option<u8>,

    /// Also write a PNG preview of each grid
    #[arg(long)]
    preview: bool,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory for the onnx engine
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    report: Option<PipelineReport>,
    error: Option<String>,
    rejected: usize,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    apply_overrides(
        &mut config,
        args.y_threshold,
        args.green,
        args.yellow,
        args.output_dir.as_deref(),
        args.preview,
    );

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = config.export.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = Arc::new(TablePipeline::new(&config, &TracingDiagnostics)?);

    let jobs: Vec<(PathBuf, Option<PathBuf>)> = files
        .into_iter()
        .map(|path| {
            let image = find_image(&path, args.image_ext.as_deref());
            (path, image)
        })
        .collect();
    ensure_distinct_outputs(&pipeline, &jobs, args.engine)?;

    let overall_pb = ProgressBar::new(jobs.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let stop = Arc::new(AtomicBool::new(false));
    let mut tasks = JoinSet::new();

    for (path, image) in jobs {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        if stop.load(Ordering::SeqCst) {
            debug!("Not starting {} after an earlier failure", path.display());
            break;
        }

        let pipeline = Arc::clone(&pipeline);
        let stop = Arc::clone(&stop);
        let pb = overall_pb.clone();
        let engine = args.engine;
        let model_dir = args.model_dir.clone();
        let continue_on_error = args.continue_on_error;

        tasks.spawn_blocking(move || {
            let result = process_single_file(
                &pipeline,
                engine,
                path,
                image.as_deref(),
                model_dir.as_deref(),
            );
            if result.error.is_some() && !continue_on_error {
                stop.store(true, Ordering::SeqCst);
            }
            pb.inc(1);
            drop(permit);
            result
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let result = joined?;
        if let Some(error_msg) = &result.error {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), error_msg);
            } else {
                error!("Failed to process {}: {}", result.path.display(), error_msg);
                tasks.abort_all();
                overall_pb.abandon();
                anyhow::bail!("Processing failed: {}", error_msg);
            }
        }
        results.push(result);
    }
    results.sort_by(|a, b| a.path.cmp(&b.path));

    overall_pb.finish_with_message("Complete");

    let successful: Vec<_> = results.iter().filter(|r| r.report.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if args.summary {
        let summary_path = config
            .export
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Sibling image `<stem>.<ext>` of a detections file, if present.
fn find_image(path: &Path, image_ext: Option<&str>) -> Option<PathBuf> {
    let ext = image_ext?.trim_start_matches('.');
    let candidate = path.with_extension(ext);
    if candidate.is_file() {
        Some(candidate)
    } else {
        debug!("No image {} for {}", candidate.display(), path.display());
        None
    }
}

/// Concurrent requests must not share an output file.
fn ensure_distinct_outputs(
    pipeline: &TablePipeline,
    jobs: &[(PathBuf, Option<PathBuf>)],
    engine: EngineChoice,
) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for (path, image) in jobs {
        let image = image
            .as_deref()
            .or_else(|| engine.reads_image().then_some(path.as_path()));
        let paths = pipeline.output_paths(image.unwrap_or(path), image.is_some());
        if !seen.insert(paths.workbook.clone()) {
            anyhow::bail!(
                "Several inputs would write {}; use distinct file names",
                paths.workbook.display()
            );
        }
    }
    Ok(())
}

fn process_single_file(
    pipeline: &TablePipeline,
    engine: EngineChoice,
    path: PathBuf,
    image: Option<&Path>,
    model_dir: Option<&Path>,
) -> ProcessResult {
    let file_start = Instant::now();
    let diagnostics = CollectingDiagnostics::new();
    let result = run_request(pipeline, engine, &path, image, model_dir, &diagnostics);
    let processing_time_ms = file_start.elapsed().as_millis() as u64;

    match result {
        Ok(report) => {
            debug!("Wrote {}", report.workbook_path.display());
            ProcessResult {
                path,
                report: Some(report),
                error: None,
                rejected: diagnostics.rejected_count(),
                processing_time_ms,
            }
        }
        Err(e) => ProcessResult {
            path,
            report: None,
            error: Some(e.to_string()),
            rejected: diagnostics.rejected_count(),
            processing_time_ms,
        },
    }
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "detections",
        "rejected",
        "rows",
        "columns",
        "workbook",
        "overlay",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(report) = &result.report {
            wtr.write_record([
                filename,
                "success",
                &report.detection_count.to_string(),
                &result.rejected.to_string(),
                &report.row_count.to_string(),
                &report.table.column_count().to_string(),
                &report.workbook_path.display().to_string(),
                &report
                    .overlay_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                &result.rejected.to_string(),
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
