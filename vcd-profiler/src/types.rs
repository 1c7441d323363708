//! Core types for the VCD profiler library
//!
//! This module defines the fundamental types the profiler produces while
//! processing waveform dumps. Decoded values are transient per event; only
//! the aggregated tables grow with the run.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Simulation time in timescale ticks, as written after `#` markers
pub type Timestamp = u64;

/// Result type for profiler operations
pub type Result<T> = std::result::Result<T, ProfilerError>;

/// Index of a signal in the symbol table arena
///
/// Identifier codes from the dump are resolved to a `SignalId` once, during
/// the header parse; the body loop only ever deals in indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub(crate) usize);

impl SignalId {
    /// Position of the signal in the symbol table
    pub fn index(self) -> usize {
        self.0
    }
}

/// Dump metadata collected from the header commands
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// `$date`, when present and parseable
    pub date: Option<DateTime<Utc>>,
    /// `$version` text, when present
    pub version: Option<String>,
    /// `$timescale` magnitude and unit, when present
    pub timescale: Option<(u32, TimeUnit)>,
}

/// Unit of the `$timescale` header command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Fs,
    Ps,
    Ns,
    Us,
    Ms,
    S,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeUnit::Fs => "fs",
            TimeUnit::Ps => "ps",
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::S => "s",
        };
        write!(f, "{}", s)
    }
}

/// A decoded signal value at one instant
///
/// Unknown (`x`/`z`) bits are modeled as an explicit variant instead of being
/// coerced to zero; the substitution decision belongs to the configured
/// unknown-bit policy, not to the decoder's representation.
#[derive(Debug, Clone, Copy)]
pub enum DecodedValue {
    /// Two's-complement integer, already sign-extended where requested
    Integer(i64),
    /// Real-typed signal value
    Real(f64),
    /// At least one bit was `x` or `z`, or the signal has not been observed
    Unknown,
}

impl DecodedValue {
    /// True unless the value is `Unknown`
    pub fn is_known(&self) -> bool {
        !matches!(self, DecodedValue::Unknown)
    }

    /// Integer payload, if this is an integer value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DecodedValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload widened to f64, if the value is known
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::Integer(v) => Some(*v as f64),
            DecodedValue::Real(v) => Some(*v),
            DecodedValue::Unknown => None,
        }
    }
}

// Frequency tables key on decoded values, so equality and hashing must be
// total. Reals compare by bit pattern, which also gives NaN a stable slot.
impl PartialEq for DecodedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DecodedValue::Integer(a), DecodedValue::Integer(b)) => a == b,
            (DecodedValue::Real(a), DecodedValue::Real(b)) => a.to_bits() == b.to_bits(),
            (DecodedValue::Unknown, DecodedValue::Unknown) => true,
            _ => false,
        }
    }
}

impl Eq for DecodedValue {}

impl Hash for DecodedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DecodedValue::Integer(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            DecodedValue::Real(v) => {
                1u8.hash(state);
                v.to_bits().hash(state);
            }
            DecodedValue::Unknown => 2u8.hash(state),
        }
    }
}

impl PartialOrd for DecodedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DecodedValue {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &DecodedValue) -> u8 {
            match v {
                DecodedValue::Integer(_) => 0,
                DecodedValue::Real(_) => 1,
                DecodedValue::Unknown => 2,
            }
        }
        match (self, other) {
            (DecodedValue::Integer(a), DecodedValue::Integer(b)) => a.cmp(b),
            (DecodedValue::Real(a), DecodedValue::Real(b)) => a.total_cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Integer(v) => write!(f, "{}", v),
            DecodedValue::Real(v) => write!(f, "{}", v),
            DecodedValue::Unknown => write!(f, "x"),
        }
    }
}

/// Snapshot of all watched signals at one sampling instant
#[derive(Debug, Clone)]
pub struct Sample {
    /// Timestamp of the qualifying clock edge
    pub time: Timestamp,
    /// Last-known value of every watched signal, in watch order
    pub values: Vec<(SignalId, DecodedValue)>,
}

/// Errors that can abort a profiling run
#[derive(Debug, thiserror::Error)]
pub enum ProfilerError {
    /// Malformed header or declaration section; always fatal
    #[error("structural error at line {line} (near time {near_time}): {message}")]
    Structural {
        message: String,
        line: usize,
        near_time: Timestamp,
    },

    /// A per-event decode problem escalated to fatal, e.g. unknown bits
    /// under the `fail` policy
    #[error("decode error at line {line} (near time {near_time}): {reason}")]
    Decode {
        reason: DecodeReason,
        line: usize,
        near_time: Timestamp,
    },

    /// The configuration names signals the dump never declares, or carries
    /// out-of-range settings; raised before the body is parsed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Too many recorded per-event errors; the run is aborted
    #[error("aborted after {count} decode errors (last at line {line})")]
    DecodeLimitExceeded { count: usize, line: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reason attached to a recorded decode problem
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeReason {
    #[error("malformed value record: {0}")]
    Malformed(String),

    #[error("value change for undeclared identifier code `{0}`")]
    UnknownCode(String),

    #[error("unknown (x/z) bits in value for `{0}`")]
    UnknownBits(String),

    #[error("vector value for `{name}` has {got} bits but the signal is declared with {declared}")]
    WidthMismatch {
        name: String,
        got: usize,
        declared: u32,
    },

    #[error("`{name}` is {width} bits wide, beyond the {limit}-bit integer target")]
    WidthExceedsTarget { name: String, width: u32, limit: u32 },

    #[error("unsigned value of `{0}` does not fit a 64-bit signed integer")]
    Overflow(String),

    #[error("real literal `{literal}` for `{name}` does not parse")]
    MalformedReal { name: String, literal: String },

    #[error("scalar/vector value for real-typed signal `{0}`")]
    NotBitVector(String),

    #[error("real value for bit-vector signal `{0}`")]
    NotReal(String),

    #[error("timestamp goes backwards ({from} -> {to})")]
    NonMonotonicTime { from: Timestamp, to: Timestamp },
}

/// A recorded, non-fatal decode problem from the body phase
///
/// Kept with the run outcome so callers can report exactly which lines were
/// skipped and why, without the run having to abort.
#[derive(Debug, Clone)]
pub struct DecodeIssue {
    /// 1-based line in the dump
    pub line: usize,
    /// Nearest preceding timestamp marker
    pub near_time: Timestamp,
    pub reason: DecodeReason,
}

impl fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} (near time {}): {}",
            self.line, self.near_time, self.reason
        )
    }
}
