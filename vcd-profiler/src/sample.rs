//! Sampling controller
//!
//! Watches one designated clock signal and, on each qualifying edge,
//! snapshots the last-known value of every watched signal. The controller
//! caches values for all declared signals, not only watched ones, so a
//! signal added to a watch list mid-analysis would still have history.
//!
//! Edge detection and snapshotting are decoupled from the timestamp flush:
//! the pipeline closes a timestamp only after every change of that instant
//! has been applied, which is what makes a sample atomic.

use crate::types::{DecodedValue, Sample, SignalId, Timestamp};
use serde::{Deserialize, Serialize};

/// Clock edge kind that triggers sampling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockEdge {
    #[default]
    Rising,
    Falling,
}

/// Clock-edge driven snapshot collector
pub struct SamplingController {
    clock: SignalId,
    edge: ClockEdge,
    /// Last-known value of every declared signal, `Unknown` until observed
    last_values: Vec<DecodedValue>,
    clock_state: DecodedValue,
    edge_pending: bool,
    samples_taken: u64,
}

impl SamplingController {
    /// `num_signals` is the symbol table size; the cache is seeded `Unknown`
    /// and filled by `$dumpvars` entries and body changes alike
    pub fn new(clock: SignalId, edge: ClockEdge, num_signals: usize) -> Self {
        Self {
            clock,
            edge,
            last_values: vec![DecodedValue::Unknown; num_signals],
            clock_state: DecodedValue::Unknown,
            edge_pending: false,
            samples_taken: 0,
        }
    }

    /// The designated clock signal
    pub fn clock(&self) -> SignalId {
        self.clock
    }

    /// Number of samples emitted so far
    pub fn samples_taken(&self) -> u64 {
        self.samples_taken
    }

    /// Record one decoded change and track clock transitions
    pub fn record_change(&mut self, signal: SignalId, value: DecodedValue) {
        if signal == self.clock {
            if qualifies(self.edge, &self.clock_state, &value) {
                self.edge_pending = true;
            }
            self.clock_state = value;
        }
        self.last_values[signal.index()] = value;
    }

    /// Last-known value of a signal
    pub fn last_value(&self, signal: SignalId) -> DecodedValue {
        self.last_values[signal.index()]
    }

    /// Close a timestamp: if a qualifying clock edge occurred within it,
    /// emit exactly one sample of the watched signals
    ///
    /// The pipeline calls this once per distinct timestamp, so duplicate
    /// `#t` markers collapse into a single sample.
    pub fn end_of_timestamp(&mut self, time: Timestamp, watched: &[SignalId]) -> Option<Sample> {
        if !self.edge_pending {
            return None;
        }
        self.edge_pending = false;
        self.samples_taken += 1;
        let values = watched
            .iter()
            .map(|&id| (id, self.last_values[id.index()]))
            .collect();
        Some(Sample { time, values })
    }
}

/// An edge is a transition into the target level from any other state, so
/// an initial `1` seeded by `$dumpvars` counts as a rising edge
fn qualifies(edge: ClockEdge, prev: &DecodedValue, next: &DecodedValue) -> bool {
    match edge {
        ClockEdge::Rising => next.as_i64() == Some(1) && prev.as_i64() != Some(1),
        ClockEdge::Falling => next.as_i64() == Some(0) && prev.as_i64() != Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLK: SignalId = SignalId(0);
    const DATA: SignalId = SignalId(1);

    fn controller(edge: ClockEdge) -> SamplingController {
        SamplingController::new(CLK, edge, 2)
    }

    #[test]
    fn test_initial_high_counts_as_rising_edge() {
        let mut ctrl = controller(ClockEdge::Rising);
        ctrl.record_change(CLK, DecodedValue::Integer(1));
        assert!(ctrl.end_of_timestamp(0, &[DATA]).is_some());
    }

    #[test]
    fn test_rising_edge_detection() {
        let mut ctrl = controller(ClockEdge::Rising);
        ctrl.record_change(CLK, DecodedValue::Integer(0));
        assert!(ctrl.end_of_timestamp(0, &[]).is_none());

        ctrl.record_change(CLK, DecodedValue::Integer(1));
        assert!(ctrl.end_of_timestamp(5, &[]).is_some());

        // staying high is not an edge
        ctrl.record_change(CLK, DecodedValue::Integer(1));
        assert!(ctrl.end_of_timestamp(10, &[]).is_none());
    }

    #[test]
    fn test_falling_edge_detection() {
        let mut ctrl = controller(ClockEdge::Falling);
        ctrl.record_change(CLK, DecodedValue::Integer(1));
        assert!(ctrl.end_of_timestamp(0, &[]).is_none());

        ctrl.record_change(CLK, DecodedValue::Integer(0));
        assert!(ctrl.end_of_timestamp(5, &[]).is_some());
    }

    #[test]
    fn test_unknown_clock_never_triggers() {
        let mut ctrl = controller(ClockEdge::Rising);
        ctrl.record_change(CLK, DecodedValue::Unknown);
        assert!(ctrl.end_of_timestamp(0, &[]).is_none());
        // recovering from x to 1 is a rising edge
        ctrl.record_change(CLK, DecodedValue::Integer(1));
        assert!(ctrl.end_of_timestamp(5, &[]).is_some());
    }

    #[test]
    fn test_sample_carries_last_known_values() {
        let mut ctrl = controller(ClockEdge::Rising);
        ctrl.record_change(DATA, DecodedValue::Integer(42));
        ctrl.record_change(CLK, DecodedValue::Integer(1));

        let sample = ctrl.end_of_timestamp(7, &[DATA]).unwrap();
        assert_eq!(sample.time, 7);
        assert_eq!(sample.values, vec![(DATA, DecodedValue::Integer(42))]);
    }

    #[test]
    fn test_unobserved_signal_samples_unknown() {
        let mut ctrl = controller(ClockEdge::Rising);
        ctrl.record_change(CLK, DecodedValue::Integer(1));
        let sample = ctrl.end_of_timestamp(0, &[DATA]).unwrap();
        assert_eq!(sample.values, vec![(DATA, DecodedValue::Unknown)]);
    }

    #[test]
    fn test_glitch_within_one_timestamp_is_one_sample() {
        let mut ctrl = controller(ClockEdge::Rising);
        ctrl.record_change(CLK, DecodedValue::Integer(0));
        let _ = ctrl.end_of_timestamp(0, &[]);

        // 0 -> 1 -> 0 -> 1 inside one timestamp
        ctrl.record_change(CLK, DecodedValue::Integer(1));
        ctrl.record_change(CLK, DecodedValue::Integer(0));
        ctrl.record_change(CLK, DecodedValue::Integer(1));
        assert!(ctrl.end_of_timestamp(5, &[]).is_some());
        assert_eq!(ctrl.samples_taken(), 1);

        // nothing pending afterwards
        assert!(ctrl.end_of_timestamp(6, &[]).is_none());
    }
}
