//! Process command - build a table from a single detections file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use tabscan_core::{CollectingDiagnostics, PipelineReport, TablePipeline, TabscanConfig};

use super::format::{format_report, legend, OutputFormat};
use super::{load_config, load_detections, log_warnings, EngineChoice};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Detections file (JSON or TSV), or an image with the onnx engine
    #[arg(required = true)]
    input: PathBuf,

    /// Engine that produced the detections (paddle, easyocr, tesseract)
    #[arg(short, long)]
    engine: EngineChoice,

    /// Source image for the overlay
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Directory for the workbook and images (default: next to the input)
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Write the rendered table to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum vertical distance in pixels from a row's first detection
    #[arg(long)]
    y_threshold: Option<f32>,

    /// Green tier lower bound in percent
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    green: Option<u8>,

    /// Yellow tier lower bound in percent
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    yellow: Option<u8>,

    /// Output format for the table
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Also write a PNG preview of the grid
    #[arg(long)]
    preview: bool,

    /// Model directory for the onnx engine
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(
    config: &mut TabscanConfig,
    y_threshold: Option<f32>,
    green: Option<u8>,
    yellow: Option<u8>,
    output_dir: Option<&Path>,
    preview: bool,
) {
    if let Some(y) = y_threshold {
        config.layout.y_threshold = y;
    }
    if let Some(g) = green {
        config.confidence.green_threshold = f32::from(g) / 100.0;
    }
    if let Some(y) = yellow {
        config.confidence.yellow_threshold = f32::from(y) / 100.0;
    }
    if let Some(dir) = output_dir {
        config.export.output_dir = Some(dir.to_path_buf());
    }
    if preview {
        config.export.write_preview = true;
    }
}

/// Run one request end to end.
pub fn run_request(
    pipeline: &TablePipeline,
    engine: EngineChoice,
    input: &Path,
    image: Option<&Path>,
    model_dir: Option<&Path>,
    diagnostics: &CollectingDiagnostics,
) -> anyhow::Result<PipelineReport> {
    let image = image.or_else(|| engine.reads_image().then_some(input));
    let detections = load_detections(engine, input, model_dir, diagnostics)?;
    debug!("Loaded {} detections from {}", detections.len(), input.display());

    let paths = pipeline.output_paths(image.unwrap_or(input), image.is_some());
    let report = pipeline.run(&detections, image, &paths, diagnostics);
    log_warnings(input, diagnostics);

    Ok(report?)
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
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

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if let Some(image) = &args.image {
        if !image.exists() {
            anyhow::bail!("Image not found: {}", image.display());
        }
    }
    if let Some(dir) = &config.export.output_dir {
        fs::create_dir_all(dir)?;
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message("Building table...");

    let diagnostics = CollectingDiagnostics::new();
    let pipeline = TablePipeline::new(&config, &diagnostics)?;
    let report = run_request(
        &pipeline,
        args.engine,
        &args.input,
        args.image.as_deref(),
        args.model_dir.as_deref(),
        &diagnostics,
    );

    pb.finish_and_clear();
    let report = report?;

    let output = format_report(&report, pipeline.thresholds(), args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        print!("{}", output);
    }

    if matches!(args.format, OutputFormat::Text) {
        eprintln!("{} {}", style("ℹ").blue(), legend(pipeline.thresholds()));
    }

    let rejected = diagnostics.rejected_count();
    if rejected > 0 {
        eprintln!(
            "{} Dropped {} malformed detections",
            style("⚠").yellow(),
            rejected
        );
    }

    eprintln!(
        "{} Workbook saved at {}",
        style("✓").green(),
        report.workbook_path.display()
    );
    if let Some(path) = &report.overlay_path {
        eprintln!("{} Overlay saved at {}", style("✓").green(), path.display());
    }
    if let Some(path) = &report.preview_path {
        eprintln!("{} Preview saved at {}", style("✓").green(), path.display());
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
