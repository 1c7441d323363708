//! Output directory orchestration
//!
//! Writes one table file per watched signal, plus an optional machine-
//! readable run summary. Signal tables are independent output units, so
//! they are written in parallel and a failure on one is logged and reported
//! without touching the others.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;
use vcd_profiler::{report, ProfileConfig, ProfileOutcome, SignalProbe};

/// What happened while writing the output directory
#[derive(Debug, Clone, Copy)]
pub struct WriteSummary {
    pub written: usize,
    pub failed: usize,
}

/// Write every watched signal's table into `dir`
pub fn write_outputs(
    dir: &Path,
    input: &Path,
    profile: &ProfileConfig,
    outcome: &ProfileOutcome,
    with_summary: bool,
) -> Result<WriteSummary> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let mut failures: Vec<(String, String)> = outcome
        .results
        .par_iter()
        .filter_map(|result| match report::write_signal_result(dir, result) {
            Ok(path) => {
                log::debug!("Wrote `{}` to {:?}", result.name, path);
                None
            }
            Err(e) => {
                log::error!("Failed to write output for `{}`: {}", result.name, e);
                Some((result.name.clone(), e.to_string()))
            }
        })
        .collect();
    failures.sort();

    let written = outcome.results.len() - failures.len();

    if with_summary {
        write_run_summary(dir, input, profile, outcome, &failures)?;
    }

    Ok(WriteSummary {
        written,
        failed: failures.len(),
    })
}

#[derive(Serialize)]
struct RunSummary<'a> {
    input: String,
    mode: vcd_profiler::ProfileMode,
    clock_signal: &'a str,
    dump_date: Option<String>,
    dump_version: Option<&'a str>,
    timescale: Option<String>,
    signals_declared: usize,
    signals_watched: usize,
    timestamps: u64,
    changes: u64,
    samples: u64,
    decode_errors: usize,
    outputs: Vec<OutputEntry>,
    failures: Vec<FailureEntry>,
}

#[derive(Serialize)]
struct OutputEntry {
    signal: String,
    file: String,
    rows: usize,
}

#[derive(Serialize)]
struct FailureEntry {
    signal: String,
    error: String,
}

/// The summary only contains data derived from the dump and the run, never
/// wall-clock time, so reruns stay byte-identical
fn write_run_summary(
    dir: &Path,
    input: &Path,
    profile: &ProfileConfig,
    outcome: &ProfileOutcome,
    failures: &[(String, String)],
) -> Result<()> {
    let mut outputs: Vec<OutputEntry> = outcome
        .results
        .iter()
        .filter(|r| !failures.iter().any(|(name, _)| name == &r.name))
        .map(|r| OutputEntry {
            signal: r.name.clone(),
            file: report::output_file_name(&r.name),
            rows: match &r.probe {
                SignalProbe::Frequency(table) => table.distinct(),
                SignalProbe::TimeSeries(series) => series.len(),
            },
        })
        .collect();
    outputs.sort_by(|a, b| a.signal.cmp(&b.signal));

    let summary = RunSummary {
        input: input.display().to_string(),
        mode: profile.mode,
        clock_signal: &profile.clock_signal,
        dump_date: outcome.metadata.date.map(|d| d.to_rfc3339()),
        dump_version: outcome.metadata.version.as_deref(),
        timescale: outcome
            .metadata
            .timescale
            .map(|(mag, unit)| format!("{}{}", mag, unit)),
        signals_declared: outcome.table.len(),
        signals_watched: outcome.results.len(),
        timestamps: outcome.stats.timestamps,
        changes: outcome.stats.changes,
        samples: outcome.stats.samples,
        decode_errors: outcome.stats.decode_errors,
        outputs,
        failures: failures
            .iter()
            .map(|(signal, error)| FailureEntry {
                signal: signal.clone(),
                error: error.clone(),
            })
            .collect(),
    };

    let path = dir.join("summary.json");
    let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("Wrote run summary to {:?}", path);
    Ok(())
}
