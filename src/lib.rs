//! detkit: COCO to YOLO dataset conversion and video detection overlays.
//!
//! The crate has two independent halves:
//!
//! - [`convert`] turns a COCO JSON annotation document into the YOLO
//!   `images/` + `labels/` layout, one split at a time.
//! - [`video`] runs a detector over a video, draws the detections and a
//!   frame-rate counter, and shows and/or writes the result.
//!
//! # Modules
//!
//! - [`ir`]: Dataset types, the COCO reader and the YOLO label format
//! - [`convert`]: The annotation converter and its report
//! - [`config`]: Split layout for `convert-splits`
//! - [`video`]: The video annotation loop and its backends
//! - [`error`]: Error types for detkit operations

pub mod config;
pub mod convert;
pub mod error;
pub mod ir;
pub mod utils;
pub mod video;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

pub use error::DetkitError;

use config::DatasetConfig;
use convert::{parse_category_map, CategoryMap, ConversionReport, ConvertOptions, SkipPolicy};

/// The detkit CLI application.
#[derive(Parser)]
#[command(name = "detkit")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert one COCO JSON file into a YOLO images/ + labels/ tree.
    Convert(ConvertArgs),

    /// Convert every configured split and write data.yaml.
    ConvertSplits(ConvertSplitsArgs),

    /// Run a detector over a video and overlay the detections.
    Annotate(AnnotateArgs),
}

/// Output format for the conversion report.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// COCO JSON annotation file.
    #[arg(long)]
    annotations: PathBuf,

    /// Directory holding the source images.
    #[arg(long)]
    images: PathBuf,

    /// Output root; images/ and labels/ are created inside it.
    #[arg(long)]
    output: PathBuf,

    /// Category id to class index mapping, e.g. "1:0,2:1" (default: 0..=4 identity).
    #[arg(long, value_parser = parse_category_map)]
    category_map: Option<CategoryMap>,

    /// Fail on the first annotation that cannot be converted.
    #[arg(long)]
    strict: bool,

    /// Delete existing label files in the output before converting.
    #[arg(long)]
    fresh: bool,

    /// Report format printed to stdout.
    #[arg(long, value_enum, default_value = "text")]
    report: ReportFormat,
}

#[derive(clap::Args)]
struct ConvertSplitsArgs {
    /// YAML dataset config (default: the built-in fisheye layout).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the config's raw_root.
    #[arg(long)]
    raw_root: Option<PathBuf>,

    /// Override the config's converted_root.
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Override the config's category map, e.g. "1:0,2:1".
    #[arg(long, value_parser = parse_category_map)]
    category_map: Option<CategoryMap>,

    /// Fail on the first annotation that cannot be converted.
    #[arg(long)]
    strict: bool,

    /// Delete existing label files in each split before converting.
    #[arg(long)]
    fresh: bool,
}

#[derive(clap::Args)]
struct AnnotateArgs {
    /// YOLOv8 detection model exported to ONNX.
    #[arg(long)]
    model: PathBuf,

    /// Input video file.
    #[arg(long)]
    video: PathBuf,

    /// Write the annotated video here (mp4v).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Show frames in a window; press 'q' to stop.
    #[arg(long)]
    display: bool,

    /// Class names file, one per line (default: Bus, Bike, Car, Pedestrian, Truck).
    #[arg(long)]
    names: Option<PathBuf>,

    /// Minimum class score for a detection.
    #[arg(long, default_value_t = video::postprocess::DEFAULT_CONF_THRESHOLD)]
    conf_threshold: f32,

    /// IoU above which overlapping boxes of one class are suppressed.
    #[arg(long, default_value_t = video::postprocess::DEFAULT_IOU_THRESHOLD)]
    iou_threshold: f32,
}

/// Run the detkit CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), DetkitError> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Commands::Convert(args) => run_convert(args),
        Commands::ConvertSplits(args) => run_convert_splits(args),
        Commands::Annotate(args) => run_annotate(args),
    }
}

fn init_logging(level: log::LevelFilter) {
    let env = env_logger::Env::default().default_filter_or(level.as_str());
    // A second init (e.g. in-process tests) is harmless.
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn skip_policy(strict: bool) -> SkipPolicy {
    if strict {
        SkipPolicy::Strict
    } else {
        SkipPolicy::Drop
    }
}

fn run_convert(args: ConvertArgs) -> Result<(), DetkitError> {
    let opts = ConvertOptions {
        category_map: args.category_map.unwrap_or_default(),
        skip_policy: skip_policy(args.strict),
        fresh: args.fresh,
        progress: true,
    };

    let report =
        convert::convert_coco_to_yolo(&args.annotations, &args.images, &args.output, &opts)?;
    report.log_summary();
    print_report(&report, args.report)
}

fn print_report(report: &ConversionReport, format: ReportFormat) -> Result<(), DetkitError> {
    match format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report).map_err(DetkitError::ReportWrite)?;
            println!("{json}");
        }
        ReportFormat::Text => print!("{report}"),
    }
    Ok(())
}

fn run_convert_splits(args: ConvertSplitsArgs) -> Result<(), DetkitError> {
    let mut config = match &args.config {
        Some(path) => DatasetConfig::load(path)?,
        None => DatasetConfig::default(),
    };
    if let Some(raw_root) = args.raw_root {
        config.raw_root = raw_root;
    }
    if let Some(output_root) = args.output_root {
        config.converted_root = output_root;
    }
    if let Some(category_map) = args.category_map {
        config.category_map = category_map;
    }
    config.validate()?;

    let opts = ConvertOptions {
        category_map: config.category_map.clone(),
        skip_policy: skip_policy(args.strict),
        fresh: args.fresh,
        progress: true,
    };

    for split in &config.splits {
        info!("Converting split '{}'", split.name);
        let report = convert::convert_coco_to_yolo(
            &config.split_annotations(split),
            &config.split_images(split),
            &config.split_output(split),
            &opts,
        )?;
        report.log_summary();
        print!("{report}");
    }

    let data_yaml = ir::io_yolo::write_data_yaml(
        &config.converted_root,
        &config.split_names(),
        &config.class_names,
    )?;
    info!("Wrote {}", data_yaml.display());
    println!("Dataset config: {}", data_yaml.display());
    Ok(())
}

fn class_names_for(args: &AnnotateArgs) -> Result<Vec<String>, DetkitError> {
    match &args.names {
        Some(path) => video::read_class_names(path),
        None => Ok(DatasetConfig::default().class_names),
    }
}

#[cfg(feature = "opencv")]
fn run_annotate(args: AnnotateArgs) -> Result<(), DetkitError> {
    use video::opencv_backend::{HighGuiDisplay, OnnxDetector, OpenCvVideoSource, OpenCvVideoWriter};
    use video::{FrameDisplay, FrameSink};

    if args.output.is_none() && !args.display {
        warn!("Neither --output nor --display given; frames are processed but not kept");
    }

    let class_names = class_names_for(&args)?;
    let mut source = OpenCvVideoSource::open(&args.video)?;
    let mut detector = OnnxDetector::load(
        &args.model,
        class_names,
        args.conf_threshold,
        args.iou_threshold,
    )?;

    let mut writer = args
        .output
        .as_ref()
        .map(|path| OpenCvVideoWriter::new(path, source.fps()));
    let mut display = args
        .display
        .then(|| HighGuiDisplay::new(format!("{} Inference", args.model.display())));

    let summary = video::annotate_video(
        &mut source,
        &mut detector,
        writer.as_mut().map(|w| w as &mut dyn FrameSink<_>),
        display.as_mut().map(|d| d as &mut dyn FrameDisplay<_>),
    )?;
    summary.log_summary();
    Ok(())
}

#[cfg(not(feature = "opencv"))]
fn run_annotate(args: AnnotateArgs) -> Result<(), DetkitError> {
    class_names_for(&args)?;
    if args.output.is_none() && !args.display {
        warn!("Neither --output nor --display given");
    }
    Err(DetkitError::VideoBackendUnavailable)
}
