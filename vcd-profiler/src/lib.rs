//! VCD Profiler Library
//!
//! A streaming profiler for value-change waveform dumps. It scans a VCD
//! file once, samples watched signals on a configured clock edge, and
//! accumulates per-signal value-frequency tables (or time series) whose
//! memory cost depends only on the number of distinct observed values. The
//! intended use is choosing minimal fixed-point encodings: the tables show
//! every value a signal actually took over a whole simulation.
//!
//! # Architecture
//!
//! The pipeline is single-threaded, pull-based and streaming:
//!
//! - [`formats::VcdLexer`] tokenizes the dump without loading it
//! - [`signals`] builds the symbol table from the declaration section
//! - [`decode`] turns raw tokens into typed values (sign extension,
//!   unknown-bit policy)
//! - [`watch::WatcherRegistry`] delivers decoded changes to per-signal
//!   observers, atomically per timestamp
//! - [`sample::SamplingController`] snapshots watched signals on each
//!   qualifying clock edge
//! - [`stats`] aggregates samples into frequency tables or time series
//! - [`report`] serializes one tab-delimited file per watched signal
//!
//! The library does NOT render plots, suggest fixed-point formats, or
//! convert between waveform dialects; it is the measurement stage only.
//!
//! # Example Usage
//!
//! ```no_run
//! use vcd_profiler::{NumericMode, ProfileConfig, Profiler};
//! use std::path::Path;
//!
//! let config = ProfileConfig::new("clk")
//!     .with_signals(vec!["top.alu.acc".to_string()])
//!     .with_numeric(NumericMode::Signed);
//!
//! let outcome = Profiler::new(config).run_file(Path::new("run.vcd")).unwrap();
//! for result in &outcome.results {
//!     let path = vcd_profiler::report::write_signal_result(Path::new("out"), result).unwrap();
//!     println!("{} -> {:?}", result.name, path);
//! }
//! ```

// Public modules
pub mod config;
pub mod decode;
pub mod formats;
pub mod profiler;
pub mod report;
pub mod sample;
pub mod signals;
pub mod stats;
pub mod types;
pub mod watch;

// Re-export main types for convenience
pub use config::{ProfileConfig, ProfileMode};
pub use decode::{DecodePolicy, NumericMode, UnknownPolicy};
pub use profiler::{ProfileOutcome, Profiler, RunStats, SignalResult};
pub use sample::{ClockEdge, SamplingController};
pub use signals::{Signal, SignalKind, SignalTable, TableStats};
pub use stats::{FrequencyTable, SignalProbe, TimeSeries};
pub use types::{
    DecodeIssue, DecodeReason, DecodedValue, Metadata, ProfilerError, Result, Sample, SignalId,
    TimeUnit, Timestamp,
};
pub use watch::{SignalObserver, Watch, WatchHandle, WatcherRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_library_basics() {
        // Smoke test: a minimal dump profiles end to end
        let dump = "\
$scope module top $end
$var wire 1 ! clk $end
$upscope $end
$enddefinitions $end
#0
1!
";
        let outcome = Profiler::new(ProfileConfig::new("clk"))
            .run_reader(Cursor::new(dump.as_bytes()))
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.stats.samples, 1);
    }
}
