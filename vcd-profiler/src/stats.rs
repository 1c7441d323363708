//! Per-signal aggregation: frequency tables and time series
//!
//! Frequency counting must stay O(distinct observed values): bit widths can
//! be large, so the table is an open, growable map keyed by decoded value,
//! never a dense array over the value range.

use crate::types::{DecodedValue, Timestamp};
use crate::watch::{SignalObserver, Watch};
use std::collections::HashMap;

/// Open mapping from observed value to occurrence count
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyTable {
    counts: HashMap<DecodedValue, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one sampled observation; unknown values are never counted
    pub fn record(&mut self, value: &DecodedValue) {
        if value.is_known() {
            *self.counts.entry(*value).or_insert(0) += 1;
        }
    }

    /// Occurrences of one value
    pub fn count(&self, value: &DecodedValue) -> u64 {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Sum of all counts; equals the number of sampling instants at which
    /// the signal had a decodable value
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct observed values
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Rows sorted by value, for deterministic serialization
    pub fn sorted_rows(&self) -> Vec<(DecodedValue, u64)> {
        let mut rows: Vec<(DecodedValue, u64)> =
            self.counts.iter().map(|(v, c)| (*v, *c)).collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

/// Ordered record of sampled (time, value) points
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    points: Vec<(Timestamp, DecodedValue)>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sampled observation; unknown instants are dropped
    pub fn record(&mut self, time: Timestamp, value: &DecodedValue) {
        if value.is_known() {
            self.points.push((time, *value));
        }
    }

    pub fn points(&self) -> &[(Timestamp, DecodedValue)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Aggregating observer attached to one watched signal
///
/// The variant is chosen by the run mode; both feed exclusively on
/// sampling instants, never on raw changes between clock edges.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalProbe {
    Frequency(FrequencyTable),
    TimeSeries(TimeSeries),
}

impl SignalProbe {
    pub fn frequency() -> Self {
        SignalProbe::Frequency(FrequencyTable::new())
    }

    pub fn time_series() -> Self {
        SignalProbe::TimeSeries(TimeSeries::new())
    }

    pub fn as_frequency(&self) -> Option<&FrequencyTable> {
        match self {
            SignalProbe::Frequency(table) => Some(table),
            SignalProbe::TimeSeries(_) => None,
        }
    }

    pub fn as_time_series(&self) -> Option<&TimeSeries> {
        match self {
            SignalProbe::TimeSeries(series) => Some(series),
            SignalProbe::Frequency(_) => None,
        }
    }

    /// Number of recorded observations
    pub fn observations(&self) -> u64 {
        match self {
            SignalProbe::Frequency(table) => table.total(),
            SignalProbe::TimeSeries(series) => series.len() as u64,
        }
    }
}

impl SignalObserver for SignalProbe {
    fn on_sample(&mut self, time: Timestamp, value: &DecodedValue) -> Watch {
        match self {
            SignalProbe::Frequency(table) => table.record(value),
            SignalProbe::TimeSeries(series) => series.record(time, value),
        }
        Watch::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_counts() {
        let mut table = FrequencyTable::new();
        table.record(&DecodedValue::Integer(1));
        table.record(&DecodedValue::Integer(-1));
        table.record(&DecodedValue::Integer(1));

        assert_eq!(table.count(&DecodedValue::Integer(1)), 2);
        assert_eq!(table.count(&DecodedValue::Integer(-1)), 1);
        assert_eq!(table.count(&DecodedValue::Integer(5)), 0);
        assert_eq!(table.total(), 3);
        assert_eq!(table.distinct(), 2);
    }

    #[test]
    fn test_unknown_is_never_counted() {
        let mut table = FrequencyTable::new();
        table.record(&DecodedValue::Unknown);
        table.record(&DecodedValue::Integer(0));
        table.record(&DecodedValue::Unknown);
        assert_eq!(table.total(), 1);

        let mut series = TimeSeries::new();
        series.record(0, &DecodedValue::Unknown);
        series.record(5, &DecodedValue::Integer(3));
        assert_eq!(series.points(), &[(5, DecodedValue::Integer(3))]);
    }

    #[test]
    fn test_sorted_rows_are_ordered_by_value() {
        let mut table = FrequencyTable::new();
        table.record(&DecodedValue::Integer(7));
        table.record(&DecodedValue::Integer(-3));
        table.record(&DecodedValue::Integer(0));

        let rows = table.sorted_rows();
        let values: Vec<DecodedValue> = rows.iter().map(|(v, _)| *v).collect();
        assert_eq!(
            values,
            vec![
                DecodedValue::Integer(-3),
                DecodedValue::Integer(0),
                DecodedValue::Integer(7),
            ]
        );
    }

    #[test]
    fn test_real_frequency() {
        let mut table = FrequencyTable::new();
        table.record(&DecodedValue::Real(3.14));
        table.record(&DecodedValue::Real(3.14));
        assert_eq!(table.count(&DecodedValue::Real(3.14)), 2);
        assert_eq!(table.distinct(), 1);
    }

    #[test]
    fn test_probe_dispatches_by_mode() {
        let mut freq = SignalProbe::frequency();
        freq.on_sample(0, &DecodedValue::Integer(4));
        freq.on_sample(10, &DecodedValue::Integer(4));
        assert_eq!(freq.as_frequency().unwrap().total(), 2);
        assert!(freq.as_time_series().is_none());

        let mut series = SignalProbe::time_series();
        series.on_sample(0, &DecodedValue::Integer(4));
        series.on_sample(10, &DecodedValue::Integer(5));
        assert_eq!(
            series.as_time_series().unwrap().points(),
            &[
                (0, DecodedValue::Integer(4)),
                (10, DecodedValue::Integer(5)),
            ]
        );
        assert_eq!(series.observations(), 2);
    }
}
