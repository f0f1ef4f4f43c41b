mod render;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use melt_lib::{
    config::{
        read_config, AnalysisConfig, ResamplingMode, IN718_MELT_TEMPERATURE,
        MELT_HISTORY_THRESHOLD,
    },
    io::{
        grid::read_slice_csv,
        report::{write_report_files, write_summary_report, MeltPoolReport},
        series_csv::{read_series_csv, write_intervals_csv, write_samples_csv},
        text as text_io,
        timestep::discover_timestep_files,
    },
    metrics::{
        melt::{analyze_crossings, value_stats, CrossingAnalysis, ValueStats},
        melt_pool::measure_melt_pool,
    },
    plot::{figure_from_crossings, figure_from_melt_pool, PlotBackend},
    sampling::{assemble_history, ProbeSpec, SkippedFrame},
    signal::Series,
};
use serde::Serialize;
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use crate::render::PngBackend;

/// Point budget for plotted curves.
const PLOT_MAX_POINTS: usize = 4096;

#[derive(Parser)]
#[command(
    name = "melt",
    version,
    about = "Melt analysis tools for laser / additive-manufacturing simulation output"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct AnalysisArgs {
    /// Threshold the signal is compared against (strictly greater counts as above)
    #[arg(long)]
    threshold: Option<f64>,
    /// TOML settings file; command-line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    /// Detect on the input samples directly instead of an oversampled copy
    #[arg(long)]
    segmentwise: bool,
    /// Oversampling factor applied before detection
    #[arg(long)]
    oversample_factor: Option<usize>,
}

#[derive(Args, Clone, Default)]
struct OutputArgs {
    /// Directory for samples.csv and intervals.csv
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Render the analysis to a PNG
    #[arg(long)]
    plot: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find threshold crossings and above-threshold intervals in a time/value series
    Crossings {
        /// CSV with a header, or two-column text; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value = "time")]
        time_column: String,
        #[arg(long, default_value = "value")]
        value_column: String,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Probe one point across timestep point tables and analyse its temperature history
    TemperatureHistory {
        /// Directory holding one point-table CSV per timestep
        #[arg(long)]
        dir: PathBuf,
        /// Only use files whose name starts with this prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Probe location in millimetres
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
        point: Vec<f64>,
        /// Field names to try, highest priority first (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Accept case-insensitive partial field name matches
        #[arg(long)]
        partial_match: bool,
        /// Fall back to the first field in the table
        #[arg(long)]
        first_available: bool,
        /// Multiplier from timestep number to time
        #[arg(long)]
        time_scale: Option<f64>,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Measure melt-pool width, depth and bead height on a regular slice grid
    MeltPool {
        /// Slice CSV with x, y and value columns
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "meltHistory")]
        value_column: String,
        /// Reference line for the width measurement (m)
        #[arg(long, default_value_t = -0.3e-3, allow_hyphen_values = true)]
        y_reference: f64,
        #[arg(long, default_value_t = MELT_HISTORY_THRESHOLD)]
        threshold: f64,
        #[arg(long, default_value = "melt_pool_results")]
        out_dir: PathBuf,
        /// Render the width and vertical profiles to a PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Aggregate every *_results.json in a directory into analysis_summary.txt
    SummaryReport {
        #[arg(long)]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    match cli.command {
        Commands::Crossings {
            input,
            time_column,
            value_column,
            analysis,
            output,
        } => cmd_crossings(input.as_deref(), &time_column, &value_column, &analysis, &output)?,
        Commands::TemperatureHistory {
            dir,
            prefix,
            point,
            fields,
            partial_match,
            first_available,
            time_scale,
            analysis,
            output,
        } => {
            let overrides = AnalysisConfig {
                time_scale,
                fields: if fields.is_empty() { None } else { Some(fields) },
                partial_match: partial_match.then_some(true),
                first_available: first_available.then_some(true),
                ..Default::default()
            };
            cmd_temperature_history(&dir, prefix.as_deref(), &point, overrides, &analysis, &output)?
        }
        Commands::MeltPool {
            input,
            value_column,
            y_reference,
            threshold,
            out_dir,
            plot,
        } => cmd_melt_pool(
            &input,
            &value_column,
            y_reference,
            threshold,
            &out_dir,
            plot.as_deref(),
        )?,
        Commands::SummaryReport { dir } => cmd_summary_report(&dir)?,
    }
    Ok(())
}

/// File settings overlaid with command-line flags.
fn resolve_config(args: &AnalysisArgs, extra: AnalysisConfig) -> Result<AnalysisConfig> {
    let base = match &args.config {
        Some(path) => read_config(path)?,
        None => AnalysisConfig::default(),
    };
    let flags = AnalysisConfig {
        threshold: args.threshold,
        resampling: args.segmentwise.then_some(ResamplingMode::Segmentwise),
        oversample_factor: args.oversample_factor,
        ..Default::default()
    };
    Ok(base.merged(extra).merged(flags))
}

fn read_series(input: Option<&Path>, time_col: &str, value_col: &str) -> Result<Series> {
    match input {
        Some(path) => {
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if is_csv {
                read_series_csv(path, time_col, value_col)
            } else {
                text_io::read_sample_pairs(path)
            }
        }
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_sample_pairs(&buf)
        }
    }
}

fn write_outputs(
    title: &str,
    series: &Series,
    analysis: &CrossingAnalysis,
    output: &OutputArgs,
    axis_labels: (&str, &str),
) -> Result<()> {
    if let Some(dir) = &output.out_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let samples = dir.join("samples.csv");
        write_samples_csv(&samples, series, analysis.threshold)?;
        info!("Samples written: {}", samples.display());
        if !analysis.intervals.is_empty() {
            let intervals = dir.join("intervals.csv");
            write_intervals_csv(&intervals, &analysis.intervals)?;
            info!("Intervals written: {}", intervals.display());
        }
    }
    if let Some(path) = &output.plot {
        let fig = figure_from_crossings(title, series, analysis, PLOT_MAX_POINTS)
            .with_labels(axis_labels.0, axis_labels.1);
        PngBackend { path: path.clone() }.draw(&fig)?;
        info!("Plot saved: {}", path.display());
    }
    Ok(())
}

fn log_analysis(analysis: &CrossingAnalysis) {
    let stats = &analysis.stats;
    info!(
        "{} crossings, {} intervals above {}",
        stats.crossing_count, stats.interval_count, analysis.threshold
    );
    for iv in &analysis.intervals {
        info!(
            "Interval {}: {:.4} ({:.4} - {:.4})",
            iv.sequence_number, iv.duration, iv.start_time, iv.end_time
        );
    }
    match stats.peak {
        Some(peak) => info!(
            "Longest interval #{} lasts {:.4}; total above threshold {:.4}",
            peak.sequence_number, peak.duration, stats.total_duration
        ),
        None => info!("Signal never stayed above {}", analysis.threshold),
    }
}

fn cmd_crossings(
    input: Option<&Path>,
    time_col: &str,
    value_col: &str,
    args: &AnalysisArgs,
    output: &OutputArgs,
) -> Result<()> {
    let cfg = resolve_config(args, AnalysisConfig::default())?;
    let threshold = cfg.threshold.unwrap_or(IN718_MELT_TEMPERATURE);
    let series = read_series(input, time_col, value_col)?;
    let analysis = analyze_crossings(&series, threshold, cfg.resampling())?;
    log_analysis(&analysis);
    write_outputs("Threshold crossings", &series, &analysis, output, ("Time", "Value"))?;
    println!("{}", serde_json::to_string(&analysis)?);
    Ok(())
}

#[derive(Serialize)]
struct HistorySummary {
    target_mm: [f64; 3],
    time_scale: f64,
    files: usize,
    sampled: usize,
    skipped: Vec<SkippedFrame>,
    values: Option<ValueStats>,
    analysis: CrossingAnalysis,
}

fn cmd_temperature_history(
    dir: &Path,
    prefix: Option<&str>,
    point: &[f64],
    overrides: AnalysisConfig,
    args: &AnalysisArgs,
    output: &OutputArgs,
) -> Result<()> {
    let target_mm: [f64; 3] = point
        .try_into()
        .map_err(|_| anyhow!("--point needs exactly three coordinates (x y z in mm)"))?;
    if !dir.is_dir() {
        bail!("directory not found: {}", dir.display());
    }
    let cfg = resolve_config(args, overrides)?;
    let threshold = cfg.threshold.unwrap_or(IN718_MELT_TEMPERATURE);

    let files = discover_timestep_files(dir, prefix, &["csv"])?;
    if files.is_empty() {
        bail!("no timestep files found in {}", dir.display());
    }
    info!("Found {} timestep files in {}", files.len(), dir.display());

    let spec = ProbeSpec::from_millimetres(target_mm, cfg.field_selector(), cfg.time_scale());
    let history = assemble_history(&files, &spec);
    if history.series.is_empty() {
        bail!(
            "no values extracted from {} files (fields tried: {:?})",
            files.len(),
            spec.selector.candidates
        );
    }
    if !history.skipped.is_empty() {
        warn!("{} of {} files skipped", history.skipped.len(), files.len());
    }

    let analysis = analyze_crossings(&history.series, threshold, cfg.resampling())?;
    log_analysis(&analysis);
    let title = format!(
        "Temperature history at ({}, {}, {}) mm",
        target_mm[0], target_mm[1], target_mm[2]
    );
    write_outputs(&title, &history.series, &analysis, output, ("Time", "Temperature (K)"))?;

    let summary = HistorySummary {
        target_mm,
        time_scale: spec.time_scale,
        files: files.len(),
        sampled: history.series.len(),
        skipped: history.skipped,
        values: value_stats(&history.series),
        analysis,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_melt_pool(
    input: &Path,
    value_col: &str,
    y_reference: f64,
    threshold: f64,
    out_dir: &Path,
    plot: Option<&Path>,
) -> Result<()> {
    let grid = read_slice_csv(input, value_col)?;
    info!(
        "Loaded {}x{} slice from {}",
        grid.x().len(),
        grid.y().len(),
        input.display()
    );
    let measurement = measure_melt_pool(&grid, y_reference, threshold);
    info!(
        "Width {:.3} mm, depth {:.3} mm, height {:.3} mm",
        measurement.width * 1e3,
        measurement.depth * 1e3,
        measurement.height * 1e3
    );
    let report = MeltPoolReport::new(input, value_col, measurement);
    let (json_path, txt_path) = write_report_files(out_dir, &report)?;
    info!("Results saved: {} and {}", json_path.display(), txt_path.display());
    if let Some(path) = plot {
        let title = format!("Melt pool - {}", report.source_file);
        let fig = figure_from_melt_pool(&title, &grid, &report.measurement);
        PngBackend {
            path: path.to_path_buf(),
        }
        .draw(&fig)?;
        info!("Plot saved: {}", path.display());
    }
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn cmd_summary_report(dir: &Path) -> Result<()> {
    match write_summary_report(dir)? {
        Some(path) => println!("{}", path.display()),
        None => bail!("no analysis results found in {}", dir.display()),
    }
    Ok(())
}
