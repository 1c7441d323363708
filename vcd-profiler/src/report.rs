//! Per-signal table serialization
//!
//! Each watched signal gets its own tab-delimited file, so a failure writing
//! one signal can never corrupt another's output. Frequency rows are sorted
//! by value and time-series rows keep sample order, which makes reruns over
//! identical input byte-identical.

use crate::profiler::SignalResult;
use crate::stats::{FrequencyTable, SignalProbe, TimeSeries};
use crate::types::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Map a dotted signal name to a file name, replacing anything a filesystem
/// might object to
pub fn output_file_name(signal_name: &str) -> String {
    let safe: String = signal_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.tsv", safe)
}

/// Write one frequency table: header row `value\tcount`, one row per
/// distinct value
pub fn write_frequency_table(path: &Path, table: &FrequencyTable) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "value\tcount")?;
    for (value, count) in table.sorted_rows() {
        writeln!(out, "{}\t{}", value, count)?;
    }
    out.flush()?;
    Ok(())
}

/// Write one time series: header row `time\tvalue`, one row per sample
pub fn write_time_series(path: &Path, series: &TimeSeries) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "time\tvalue")?;
    for (time, value) in series.points() {
        writeln!(out, "{}\t{}", time, value)?;
    }
    out.flush()?;
    Ok(())
}

/// Write one watched signal's table into `dir`, returning the file path
pub fn write_signal_result(dir: &Path, result: &SignalResult) -> Result<PathBuf> {
    let path = dir.join(output_file_name(&result.name));
    match &result.probe {
        SignalProbe::Frequency(table) => write_frequency_table(&path, table)?,
        SignalProbe::TimeSeries(series) => write_time_series(&path, series)?,
    }
    log::debug!("Wrote {:?}", path);
    Ok(path)
}
