use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tumorscan::{
    DetectionResult, DetectorConfig, RegionSummary, TumorDetector, generate_visualizations,
};

/// Extensions accepted as input, matched case-insensitively
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "dcm"];

#[derive(Parser)]
#[command(name = "tumorscan")]
#[command(about = "Screen a grayscale medical image for tumor-like regions")]
struct Cli {
    /// Path to input image file (png, jpg, jpeg or dcm)
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Directory receiving the diagnostic images
    #[arg(short, long, value_name = "DIR", default_value = "results")]
    output_dir: PathBuf,

    /// Base name of the diagnostic images (defaults to the input file stem)
    #[arg(long)]
    name: Option<String>,

    /// JSON file overriding detection thresholds
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Only run detection
    #[arg(long)]
    skip_visualizations: bool,

    /// Save intermediate images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Report {
    input: PathBuf,
    detection: DetectionResult,
    visualizations: Option<[String; 3]>,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    check_extension(&args.image_path)?;

    let config = match &args.config {
        Some(path) => DetectorConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DetectorConfig::default(),
    };

    let mut detector = TumorDetector::with_config(config.clone())?;
    if let Some(debug_dir) = &args.debug_out {
        detector = detector.with_debug(debug_dir)?;
    }

    let detection = detector.detect(&args.image_path)?;

    let visualizations = if args.skip_visualizations {
        None
    } else {
        let base_name = match &args.name {
            Some(name) => name.clone(),
            None => args
                .image_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .context("Input path has no file name")?,
        };
        let artifacts = generate_visualizations(
            &args.image_path,
            &args.output_dir,
            &base_name,
            &config.visualization,
        )
        .context("Failed to generate visualizations")?;
        Some(artifacts.relative_paths())
    };

    let report = Report {
        input: args.image_path,
        detection,
        visualizations,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn check_extension(path: &Path) -> anyhow::Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => anyhow::bail!(
            "Unsupported file type: {} (expected one of: {})",
            path.display(),
            ALLOWED_EXTENSIONS.join(", ")
        ),
    }
}

fn print_report(report: &Report) {
    let detection = &report.detection;

    println!("=== Tumor Screening Result ===");
    println!("Input: {}", report.input.display());
    if detection.is_degraded() {
        println!("Image could not be analysed; reporting a negative result.");
    }
    println!(
        "Tumor detected: {}",
        if detection.has_tumor { "yes" } else { "no" }
    );
    println!("Confidence: {:.2}%", detection.confidence);

    if let Some(shape) = &detection.image_shape {
        println!("Image shape: {}", shape);
    }
    if let Some(stats) = &detection.stats {
        println!(
            "Candidate area: {:.2}% of pixels in {} region(s), intensity std {:.1}",
            stats.tumor_ratio * 100.0,
            stats.region_count,
            stats.std_intensity
        );
        if let Some(region) = &stats.largest_region {
            println!("{}", describe_region(region));
        }
    }

    if let Some(paths) = &report.visualizations {
        println!("\nDiagnostic images:");
        for path in paths {
            println!("  {}", path);
        }
    }
}

fn describe_region(region: &RegionSummary) -> String {
    format!(
        "Largest region: {}x{} centred at ({}, {}) on slice {}, fill {:.0}%, aspect {:.2}",
        region.width,
        region.height,
        region.center.0,
        region.center.1,
        region.plane + 1,
        region.extent * 100.0,
        region.aspect_ratio
    )
}
