//! clickshape: digitize raster regions into polygon shapefiles.
//!
//! Loads a raster (GeoTIFF or plain image), then turns each click into a
//! single-polygon shapefile at `<dir>/<stem>/<stem>.shp`. Every click
//! overwrites the previous output.
//!
//! Clicks come from repeated `--click X,Y` flags or, when none are
//! given, from standard input, one `X,Y` (or `X Y`) pair per line.
//! Blank lines and lines starting with `#` are ignored.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin clickshape -- [OPTIONS] <RASTER>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use clickshape_io::{ClickOutcome, Digitizer, DigitizerOptions};
use clickshape_pipeline::{
    ClickDiagnostics, Connectivity, ContourTracerKind, Extent, ExtractConfig,
};

/// Click-to-shapefile raster digitizer.
///
/// Flood-fills the region of similar values around each click, traces
/// its outline, and writes it as an EPSG:4326 polygon shapefile next to
/// the raster.
#[derive(Parser)]
#[command(name = "clickshape", version)]
struct Cli {
    /// Path to the raster (GeoTIFF, or PNG/JPEG/BMP/WebP in pixel space).
    raster: PathBuf,

    /// Crop the raster to `WEST,SOUTH,EAST,NORTH` before digitizing.
    #[arg(long, value_parser = parse_extent, allow_hyphen_values = true)]
    extent: Option<Extent>,

    /// Maximum difference from the clicked value for a pixel to join the region.
    #[arg(long, default_value_t = ExtractConfig::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Savitzky-Golay window length (odd, at least 3). Omit to skip smoothing.
    #[arg(long)]
    smoothing_window: Option<usize>,

    /// Flood fill neighbourhood.
    #[arg(long, value_enum, default_value_t = Neighbours::Eight)]
    connectivity: Neighbours,

    /// Contour tracing algorithm.
    #[arg(long, value_enum, default_value_t = Tracer::MarchingSquares)]
    tracer: Tracer,

    /// Click at `X,Y` in raster coordinates. May be repeated; when absent,
    /// clicks are read from standard input.
    #[arg(long = "click", value_parser = parse_click, allow_hyphen_values = true)]
    clicks: Vec<(f64, f64)>,

    /// Also write a `.geojson` copy of each polygon.
    #[arg(long)]
    geojson: bool,

    /// Print per-click diagnostics as JSON instead of a report.
    #[arg(long)]
    json: bool,

    /// Full extraction config as JSON. When provided, the tolerance,
    /// smoothing, connectivity, and tracer flags are ignored.
    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Neighbours {
    Four,
    Eight,
}

#[derive(Clone, Copy, ValueEnum)]
enum Tracer {
    MarchingSquares,
    BorderFollowing,
}

/// Build an [`ExtractConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<ExtractConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(ExtractConfig {
        tolerance: cli.tolerance,
        smoothing_window: cli.smoothing_window,
        connectivity: match cli.connectivity {
            Neighbours::Four => Connectivity::Four,
            Neighbours::Eight => Connectivity::Eight,
        },
        contour_tracer: match cli.tracer {
            Tracer::MarchingSquares => ContourTracerKind::MarchingSquares,
            Tracer::BorderFollowing => ContourTracerKind::BorderFollowing,
        },
    })
}

fn parse_coordinate(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid coordinate {s:?}: {e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("coordinate {s:?} is not finite"))
    }
}

/// Parse `X,Y` or `X Y`.
fn parse_click(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [x, y] => Ok((parse_coordinate(x)?, parse_coordinate(y)?)),
        _ => Err(format!("expected X,Y but got {s:?}")),
    }
}

/// Parse one line of click input. `None` for blank and comment lines.
fn parse_click_line(line: &str) -> Option<Result<(f64, f64), String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(parse_click(line))
}

/// Parse `WEST,SOUTH,EAST,NORTH`.
fn parse_extent(s: &str) -> Result<Extent, String> {
    let values = s
        .split(',')
        .map(parse_coordinate)
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        &[west, south, east, north] => {
            Extent::new(west, south, east, north).map_err(|e| e.to_string())
        }
        _ => Err(format!(
            "expected WEST,SOUTH,EAST,NORTH but got {} values",
            values.len()
        )),
    }
}

fn print_diagnostics(diagnostics: &ClickDiagnostics, json: bool) -> Result<(), String> {
    if json {
        let json = serde_json::to_string_pretty(diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", diagnostics.report());
        println!();
    }
    Ok(())
}

/// Running totals for the end-of-session summary.
#[derive(Default)]
struct Tally {
    clicks: usize,
    saved: usize,
}

/// Handle one click. `Err` ends the session.
fn handle_click(
    digitizer: &Digitizer,
    (x, y): (f64, f64),
    json: bool,
    tally: &mut Tally,
) -> Result<(), String> {
    tally.clicks += 1;
    match digitizer.click(x, y) {
        Ok(ClickOutcome::Saved { extraction, .. }) => {
            tally.saved += 1;
            print_diagnostics(&extraction.diagnostics, json)
        }
        Ok(ClickOutcome::Skipped(_)) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

fn run(cli: &Cli, digitizer: &Digitizer) -> Result<Tally, String> {
    let mut tally = Tally::default();

    if !cli.clicks.is_empty() {
        for &click in &cli.clicks {
            handle_click(digitizer, click, cli.json, &mut tally)?;
        }
        return Ok(tally);
    }

    eprintln!("Reading clicks from standard input (X,Y per line)");
    for (number, line) in std::io::stdin().lock().lines().enumerate() {
        let line = line.map_err(|e| format!("Error reading standard input: {e}"))?;
        match parse_click_line(&line) {
            None => {}
            Some(Ok(click)) => handle_click(digitizer, click, cli.json, &mut tally)?,
            Some(Err(msg)) => log::warn!("line {}: {msg}", number + 1),
        }
    }
    Ok(tally)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let options = DigitizerOptions {
        extent: cli.extent,
        config,
        geojson: cli.geojson,
    };
    let digitizer = match Digitizer::open(&cli.raster, &options) {
        Ok(d) => d,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let dimensions = digitizer.session().raster().dimensions();
    eprintln!(
        "Raster: {} ({}x{})",
        cli.raster.display(),
        dimensions.width,
        dimensions.height,
    );
    eprintln!("Output: {}", digitizer.output_path().display());
    eprintln!("Config: {:#?}", digitizer.session().config());
    eprintln!();

    match run(&cli, &digitizer) {
        Ok(tally) => {
            eprintln!("{} of {} clicks saved", tally.saved, tally.clicks);
            ExitCode::SUCCESS
        }
        Err(msg) => {
            log::error!("{msg}");
            ExitCode::FAILURE
        }
    }
}
