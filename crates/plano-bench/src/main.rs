//! plano-bench: CLI tool for pipeline parameter experimentation and
//! diagnostics.
//!
//! Runs the document scanning pipeline on a given image file with
//! configurable parameters, printing detailed per-stage diagnostics.
//! Useful for:
//!
//! - Tuning Canny thresholds, morphology/smoothing kernels, and the
//!   polygon approximation tolerance
//! - Measuring per-stage durations to identify bottlenecks
//! - Inspecting detections via an overlay of the selected quadrilateral
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin plano-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use plano_pipeline::diagnostics::{Clock, ScanDiagnostics, process_staged_with_diagnostics};
use plano_pipeline::{ScanConfig, raster};

/// Pipeline parameter experimentation and diagnostics for plano.
///
/// Runs the document scanning pipeline on a given image with
/// configurable parameters and prints per-stage timing and count
/// diagnostics.
#[derive(Parser)]
#[command(name = "plano-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Working height in pixels for boundary detection.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_WORKING_HEIGHT, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    working_height: u32,

    /// Canny low threshold.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Structuring element size for morphological open/close (odd).
    #[arg(long, default_value_t = ScanConfig::DEFAULT_MORPH_SIZE)]
    morph_size: usize,

    /// Gaussian smoothing kernel size (odd).
    #[arg(long, default_value_t = ScanConfig::DEFAULT_SMOOTH_SIZE)]
    smooth_size: usize,

    /// Gaussian smoothing sigma.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_SMOOTH_SIGMA)]
    smooth_sigma: f64,

    /// Polygon approximation tolerance as a fraction of perimeter.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_APPROX_RATIO)]
    approx_ratio: f64,

    /// Write the enhanced scan to this file.
    #[arg(long)]
    scan: Option<PathBuf>,

    /// Write the color rectified document to this file.
    #[arg(long)]
    rectified: Option<PathBuf>,

    /// Write the original image with the detected quadrilateral drawn
    /// on top to this file.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `ScanConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build a [`ScanConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<ScanConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(ScanConfig {
        working_height: cli.working_height,
        canny_low: cli.canny_low,
        canny_high: cli.canny_high,
        morph_size: cli.morph_size,
        smooth_size: cli.smooth_size,
        smooth_sigma: cli.smooth_sigma,
        approx_ratio: cli.approx_ratio,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image = match image::open(&cli.image_path) {
        Ok(decoded) => decoded.to_rgb8(),
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({}x{})",
        cli.image_path.display(),
        image.width(),
        image.height(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (staged, diagnostics) =
            match process_staged_with_diagnostics(&image, &config, &StdClock) {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("Pipeline error: {e}");
                    return ExitCode::FAILURE;
                }
            };

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        // Write image outputs on the first run only.
        if run == 0 {
            if let Some(ref path) = cli.scan
                && let Err(e) = staged.scan.save(path)
            {
                eprintln!("Error writing scan to {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            if let Some(ref path) = cli.rectified
                && let Err(e) = staged.rectified.save(path)
            {
                eprintln!("Error writing rectified image to {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            if let Some(ref path) = cli.overlay {
                let mut overlay = image.clone();
                raster::draw_polygon_mut(
                    &mut overlay,
                    &staged.quad.corners(),
                    image::Rgb([255, 0, 0]),
                    2,
                    true,
                );
                if let Err(e) = overlay.save(path) {
                    eprintln!("Error writing overlay to {}: {e}", path.display());
                    return ExitCode::FAILURE;
                }
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration.
type StageExtractor = fn(&ScanDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[ScanDiagnostics]) {
    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();
    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<20} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(34));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Downscale", |d| d.downscale.duration),
        ("Edge Map", |d| d.edge_map.duration),
        ("Contour Tracing", |d| d.contour_tracing.duration),
        ("Quad Selection", |d| d.quad_selection.duration),
        ("Rectify", |d| d.rectify.duration),
        ("Enhance", |d| d.enhance.duration),
    ];
    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<20} {stage_mean:>10.3}ms");
    }
}
