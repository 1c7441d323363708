//! Profiler configuration types
//!
//! This module defines the runtime configuration consumed by the library.
//! Anything involving files on disk (TOML profiles, output directories) is
//! handled by the application layer; the library only needs the resolved
//! settings below.

use crate::decode::{DecodePolicy, NumericMode, UnknownPolicy};
use crate::sample::ClockEdge;
use serde::{Deserialize, Serialize};

/// What each watched signal accumulates over the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileMode {
    /// Value -> occurrence-count table
    #[default]
    Frequency,
    /// Ordered (time, value) series
    Timeseries,
}

/// Configuration for one profiling run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Name of the clock signal whose edges trigger sampling
    pub clock_signal: String,

    /// Which clock edge qualifies
    #[serde(default)]
    pub edge: ClockEdge,

    /// Signals to watch, by leaf name or dotted path.
    /// Absent: watch every declared signal. Empty: watch nothing.
    #[serde(default)]
    pub signals: Option<Vec<String>>,

    /// Aggregation mode
    #[serde(default)]
    pub mode: ProfileMode,

    /// Numeric interpretation of bit-vector signals
    #[serde(default)]
    pub numeric: NumericMode,

    /// Handling of `x`/`z` bits in watched signals
    #[serde(default)]
    pub unknown_policy: UnknownPolicy,

    /// Target integer width for sign extension, `1..=64`
    #[serde(default = "default_integer_width")]
    pub integer_width: u32,

    /// Abort the run after this many recorded decode errors; 0 = unlimited
    #[serde(default = "default_max_decode_errors")]
    pub max_decode_errors: usize,
}

fn default_integer_width() -> u32 {
    64
}

fn default_max_decode_errors() -> usize {
    100
}

impl ProfileConfig {
    /// Create a configuration with defaults for everything but the clock
    pub fn new(clock_signal: impl Into<String>) -> Self {
        Self {
            clock_signal: clock_signal.into(),
            edge: ClockEdge::default(),
            signals: None,
            mode: ProfileMode::default(),
            numeric: NumericMode::default(),
            unknown_policy: UnknownPolicy::default(),
            integer_width: default_integer_width(),
            max_decode_errors: default_max_decode_errors(),
        }
    }

    /// Builder method: set the qualifying clock edge
    pub fn with_edge(mut self, edge: ClockEdge) -> Self {
        self.edge = edge;
        self
    }

    /// Builder method: watch exactly these signals
    pub fn with_signals(mut self, signals: Vec<String>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Builder method: watch every declared signal
    pub fn watch_all(mut self) -> Self {
        self.signals = None;
        self
    }

    /// Builder method: set the aggregation mode
    pub fn with_mode(mut self, mode: ProfileMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method: set the numeric interpretation
    pub fn with_numeric(mut self, numeric: NumericMode) -> Self {
        self.numeric = numeric;
        self
    }

    /// Builder method: set the unknown-bit policy
    pub fn with_unknown_policy(mut self, policy: UnknownPolicy) -> Self {
        self.unknown_policy = policy;
        self
    }

    /// Builder method: set the integer target width
    pub fn with_integer_width(mut self, width: u32) -> Self {
        self.integer_width = width;
        self
    }

    /// Builder method: set the decode-error threshold
    pub fn with_max_decode_errors(mut self, limit: usize) -> Self {
        self.max_decode_errors = limit;
        self
    }

    /// Decode policy applied to watched signals
    pub fn decode_policy(&self) -> DecodePolicy {
        DecodePolicy {
            numeric: self.numeric,
            unknown: self.unknown_policy,
            integer_width: self.integer_width,
        }
    }

    /// Range-check everything that does not need the symbol table
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.clock_signal.is_empty() {
            return Err("clock_signal must not be empty".to_string());
        }
        if !(1..=64).contains(&self.integer_width) {
            return Err(format!(
                "integer_width must be within 1..=64, got {}",
                self.integer_width
            ));
        }
        Ok(())
    }
}
