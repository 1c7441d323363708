//! Watcher registry and per-timestamp event dispatch
//!
//! The registry holds, per signal, the ordered list of registered observers.
//! It is plain owned state inside the pipeline, no globals and no
//! inheritance hooks. Dispatch is atomic per timestamp: every value change
//! belonging to a timestamp is decoded and queued before any observer for
//! that timestamp runs, so no observer ever sees a half-applied instant.

use crate::types::{DecodedValue, SignalId, Timestamp};
use std::collections::HashMap;

/// Decision returned by observer callbacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Watch {
    /// Stay registered
    #[default]
    Keep,
    /// Unregister this observer once the current timestamp's dispatch
    /// completes; deliveries already queued for this instant still arrive
    Detach,
}

/// Observer of one signal's decoded activity
///
/// Both callbacks default to no-ops so an implementation can care about
/// changes, samples, or both.
pub trait SignalObserver {
    /// One decoded value change of the observed signal
    fn on_change(&mut self, _time: Timestamp, _value: &DecodedValue) -> Watch {
        Watch::Keep
    }

    /// The observed signal's last-known value at a sampling instant
    fn on_sample(&mut self, _time: Timestamp, _value: &DecodedValue) -> Watch {
        Watch::Keep
    }
}

impl<T: SignalObserver + ?Sized> SignalObserver for Box<T> {
    fn on_change(&mut self, time: Timestamp, value: &DecodedValue) -> Watch {
        (**self).on_change(time, value)
    }

    fn on_sample(&mut self, time: Timestamp, value: &DecodedValue) -> Watch {
        (**self).on_sample(time, value)
    }
}

/// Handle identifying one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(u64);

struct Entry<O> {
    handle: WatchHandle,
    observer: O,
}

struct QueuedChange {
    signal: SignalId,
    value: DecodedValue,
}

/// Per-signal observer registry with per-timestamp dispatch
pub struct WatcherRegistry<O> {
    observers: HashMap<SignalId, Vec<Entry<O>>>,
    next_handle: u64,
    queued: Vec<QueuedChange>,
    detached: Vec<WatchHandle>,
}

impl<O: SignalObserver> WatcherRegistry<O> {
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
            next_handle: 0,
            queued: Vec::new(),
            detached: Vec::new(),
        }
    }

    /// Register an observer for a signal; observers of one signal are
    /// invoked in registration order
    pub fn register(&mut self, signal: SignalId, observer: O) -> WatchHandle {
        let handle = WatchHandle(self.next_handle);
        self.next_handle += 1;
        self.observers
            .entry(signal)
            .or_default()
            .push(Entry { handle, observer });
        handle
    }

    /// Remove a registration and return its observer
    pub fn remove(&mut self, handle: WatchHandle) -> Option<O> {
        for entries in self.observers.values_mut() {
            if let Some(pos) = entries.iter().position(|e| e.handle == handle) {
                return Some(entries.remove(pos).observer);
            }
        }
        None
    }

    /// Remove a registration, dropping the observer
    pub fn unregister(&mut self, handle: WatchHandle) -> bool {
        self.remove(handle).is_some()
    }

    /// True if any observer is registered for the signal
    pub fn is_watched(&self, signal: SignalId) -> bool {
        self.observers
            .get(&signal)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    /// Number of queued, not yet dispatched changes
    pub fn pending_changes(&self) -> usize {
        self.queued.len()
    }

    /// Queue one decoded change of the current timestamp
    pub fn queue_change(&mut self, signal: SignalId, value: DecodedValue) {
        self.queued.push(QueuedChange { signal, value });
    }

    /// Deliver every queued change of timestamp `time`, in arrival order,
    /// then apply deferred detaches
    pub fn dispatch_changes(&mut self, time: Timestamp) {
        let queued = std::mem::take(&mut self.queued);
        for change in &queued {
            if let Some(entries) = self.observers.get_mut(&change.signal) {
                for entry in entries.iter_mut() {
                    if entry.observer.on_change(time, &change.value) == Watch::Detach {
                        self.detached.push(entry.handle);
                    }
                }
            }
        }
        self.apply_detaches();
    }

    /// Deliver one sampling instant to a signal's observers
    pub fn dispatch_sample(&mut self, time: Timestamp, signal: SignalId, value: &DecodedValue) {
        if let Some(entries) = self.observers.get_mut(&signal) {
            for entry in entries.iter_mut() {
                if entry.observer.on_sample(time, value) == Watch::Detach {
                    self.detached.push(entry.handle);
                }
            }
        }
        self.apply_detaches();
    }

    fn apply_detaches(&mut self) {
        if self.detached.is_empty() {
            return;
        }
        let detached = std::mem::take(&mut self.detached);
        for entries in self.observers.values_mut() {
            entries.retain(|e| !detached.contains(&e.handle));
        }
    }
}

impl<O: SignalObserver> Default for WatcherRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(u8, Timestamp, DecodedValue)>>>;

    struct Recorder {
        tag: u8,
        log: Log,
        detach_after: Option<usize>,
        calls: usize,
    }

    impl Recorder {
        fn new(tag: u8, log: &Log) -> Self {
            Self {
                tag,
                log: Rc::clone(log),
                detach_after: None,
                calls: 0,
            }
        }

        fn detaching(tag: u8, log: &Log, after: usize) -> Self {
            Self {
                detach_after: Some(after),
                ..Self::new(tag, log)
            }
        }
    }

    impl SignalObserver for Recorder {
        fn on_change(&mut self, time: Timestamp, value: &DecodedValue) -> Watch {
            self.log.borrow_mut().push((self.tag, time, *value));
            self.calls += 1;
            match self.detach_after {
                Some(limit) if self.calls >= limit => Watch::Detach,
                _ => Watch::Keep,
            }
        }

        fn on_sample(&mut self, time: Timestamp, value: &DecodedValue) -> Watch {
            self.on_change(time, value)
        }
    }

    #[test]
    fn test_observers_run_in_registration_order() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = WatcherRegistry::new();
        let sig = SignalId(0);
        registry.register(sig, Recorder::new(1, &log));
        registry.register(sig, Recorder::new(2, &log));

        registry.queue_change(sig, DecodedValue::Integer(7));
        registry.dispatch_changes(10);

        let seen = log.borrow();
        assert_eq!(
            *seen,
            vec![
                (1, 10, DecodedValue::Integer(7)),
                (2, 10, DecodedValue::Integer(7)),
            ]
        );
    }

    #[test]
    fn test_changes_are_queued_until_dispatch() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = WatcherRegistry::new();
        let a = SignalId(0);
        let b = SignalId(1);
        registry.register(a, Recorder::new(1, &log));
        registry.register(b, Recorder::new(2, &log));

        registry.queue_change(a, DecodedValue::Integer(1));
        registry.queue_change(b, DecodedValue::Integer(2));
        assert_eq!(registry.pending_changes(), 2);
        assert!(log.borrow().is_empty());

        registry.dispatch_changes(5);
        assert_eq!(registry.pending_changes(), 0);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_detach_takes_effect_after_the_timestamp() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = WatcherRegistry::new();
        let sig = SignalId(0);
        // detaches on its very first delivery
        registry.register(sig, Recorder::detaching(1, &log, 1));

        // two changes in the same timestamp: both still arrive
        registry.queue_change(sig, DecodedValue::Integer(1));
        registry.queue_change(sig, DecodedValue::Integer(2));
        registry.dispatch_changes(0);
        assert_eq!(log.borrow().len(), 2);

        // next timestamp: the observer is gone
        registry.queue_change(sig, DecodedValue::Integer(3));
        registry.dispatch_changes(1);
        assert_eq!(log.borrow().len(), 2);
        assert!(!registry.is_watched(sig));
    }

    #[test]
    fn test_unregister_by_handle() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = WatcherRegistry::new();
        let sig = SignalId(3);
        let keep = registry.register(sig, Recorder::new(1, &log));
        let drop_me = registry.register(sig, Recorder::new(2, &log));

        assert!(registry.unregister(drop_me));
        assert!(!registry.unregister(drop_me));

        registry.queue_change(sig, DecodedValue::Integer(9));
        registry.dispatch_changes(0);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].0, 1);

        let taken = registry.remove(keep);
        assert!(taken.is_some());
        assert!(!registry.is_watched(sig));
    }

    #[test]
    fn test_sample_dispatch() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = WatcherRegistry::new();
        let sig = SignalId(0);
        registry.register(sig, Recorder::new(1, &log));

        registry.dispatch_sample(20, sig, &DecodedValue::Real(1.5));
        assert_eq!(*log.borrow(), vec![(1, 20, DecodedValue::Real(1.5))]);
    }

    #[test]
    fn test_boxed_observers_work() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut registry: WatcherRegistry<Box<dyn SignalObserver>> = WatcherRegistry::new();
        let sig = SignalId(0);
        registry.register(sig, Box::new(Recorder::new(1, &log)));
        registry.queue_change(sig, DecodedValue::Integer(4));
        registry.dispatch_changes(2);
        assert_eq!(log.borrow().len(), 1);
    }
}
