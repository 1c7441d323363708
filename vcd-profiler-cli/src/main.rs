//! VCD Profiler CLI Application
//!
//! Command-line interface for the vcd-profiler library: a batch
//! file-to-directory transform. It reads one VCD dump, samples the
//! configured signals on a clock edge, and writes one tab-delimited table
//! per watched signal plus an optional machine-readable run summary.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use vcd_profiler::{ClockEdge, NumericMode, ProfileConfig, ProfileMode, Profiler, UnknownPolicy};

mod config;
mod report;

/// VCD Profiler - per-signal value profiles for fixed-point sizing
#[derive(Parser, Debug)]
#[command(name = "vcd-profiler-cli")]
#[command(about = "Profile signal values in VCD waveform dumps", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the VCD dump to profile
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory for per-signal tables
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Path to configuration file (profile.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Clock signal whose edges trigger sampling
    #[arg(long, value_name = "NAME")]
    clock: Option<String>,

    /// Qualifying clock edge
    #[arg(long)]
    edge: Option<EdgeArg>,

    /// Signal to watch, by leaf name or dotted path (can be repeated;
    /// default: all declared)
    #[arg(short, long = "signal", value_name = "NAME")]
    signals: Vec<String>,

    /// Aggregation mode
    #[arg(long)]
    mode: Option<ModeArg>,

    /// Numeric interpretation of bit-vector signals
    #[arg(long)]
    numeric: Option<NumericArg>,

    /// Handling of x/z bits in watched signals
    #[arg(long)]
    unknown_policy: Option<UnknownArg>,

    /// Target integer width for sign extension (1..=64)
    #[arg(long, value_name = "BITS")]
    integer_width: Option<u32>,

    /// Abort after this many decode errors (0 = unlimited)
    #[arg(long, value_name = "COUNT")]
    max_decode_errors: Option<usize>,

    /// Skip writing summary.json
    #[arg(long)]
    no_summary: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum EdgeArg {
    Rising,
    Falling,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    Frequency,
    Timeseries,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum NumericArg {
    Unsigned,
    Signed,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum UnknownArg {
    Fail,
    Zero,
    Skip,
}

impl From<EdgeArg> for ClockEdge {
    fn from(arg: EdgeArg) -> Self {
        match arg {
            EdgeArg::Rising => ClockEdge::Rising,
            EdgeArg::Falling => ClockEdge::Falling,
        }
    }
}

impl From<ModeArg> for ProfileMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Frequency => ProfileMode::Frequency,
            ModeArg::Timeseries => ProfileMode::Timeseries,
        }
    }
}

impl From<NumericArg> for NumericMode {
    fn from(arg: NumericArg) -> Self {
        match arg {
            NumericArg::Unsigned => NumericMode::Unsigned,
            NumericArg::Signed => NumericMode::Signed,
        }
    }
}

impl From<UnknownArg> for UnknownPolicy {
    fn from(arg: UnknownArg) -> Self {
        match arg {
            UnknownArg::Fail => UnknownPolicy::Fail,
            UnknownArg::Zero => UnknownPolicy::Zero,
            UnknownArg::Skip => UnknownPolicy::Skip,
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("VCD Profiler CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using profiler library v{}", vcd_profiler::VERSION);

    let run = resolve_run(&args)?;

    let profiler = Profiler::new(run.profile);
    let outcome = profiler
        .run_file(&run.input)
        .with_context(|| format!("Profiling {:?} failed", run.input))?;

    let written = report::write_outputs(
        &run.outdir,
        &run.input,
        profiler.config(),
        &outcome,
        run.summary,
    )?;

    if !args.quiet {
        println!("Profiled {:?}", run.input);
        println!(
            "  signals:   {} watched of {} declared",
            outcome.results.len(),
            outcome.table.len()
        );
        println!(
            "  activity:  {} changes over {} timestamps, {} samples",
            outcome.stats.changes, outcome.stats.timestamps, outcome.stats.samples
        );
        if outcome.stats.decode_errors > 0 {
            println!(
                "  skipped:   {} events (see warnings above)",
                outcome.stats.decode_errors
            );
        }
        println!(
            "  output:    {} table(s) in {:?}",
            written.written, run.outdir
        );
    }

    if written.failed > 0 {
        bail!("{} output file(s) could not be written", written.failed);
    }

    Ok(())
}

/// Effective settings after merging the config file and CLI flags
struct RunPlan {
    input: PathBuf,
    outdir: PathBuf,
    profile: ProfileConfig,
    summary: bool,
}

fn resolve_run(args: &Args) -> Result<RunPlan> {
    let (mut profile, input_cfg, output_cfg) = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            let app = config::load_config(path)?;
            (app.profile, app.input, app.output)
        }
        None => {
            let clock = args
                .clock
                .clone()
                .context("either --config or --clock is required")?;
            (
                ProfileConfig::new(clock),
                config::InputConfig::default(),
                config::OutputConfig::default(),
            )
        }
    };

    // CLI flags override config-file values
    if let Some(clock) = &args.clock {
        profile.clock_signal = clock.clone();
    }
    if let Some(edge) = args.edge {
        profile.edge = edge.into();
    }
    if !args.signals.is_empty() {
        profile.signals = Some(args.signals.clone());
    }
    if let Some(mode) = args.mode {
        profile.mode = mode.into();
    }
    if let Some(numeric) = args.numeric {
        profile.numeric = numeric.into();
    }
    if let Some(policy) = args.unknown_policy {
        profile.unknown_policy = policy.into();
    }
    if let Some(width) = args.integer_width {
        profile.integer_width = width;
    }
    if let Some(limit) = args.max_decode_errors {
        profile.max_decode_errors = limit;
    }

    let input = args
        .input
        .clone()
        .or(input_cfg.file)
        .context("no input file given (positional argument or [input].file)")?;
    let outdir = args
        .out
        .clone()
        .or(output_cfg.dir)
        .context("no output directory given (--out or [output].dir)")?;
    let summary = output_cfg.summary && !args.no_summary;

    Ok(RunPlan {
        input,
        outdir,
        profile,
        summary,
    })
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
