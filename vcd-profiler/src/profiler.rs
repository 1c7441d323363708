//! Main profiling pipeline
//!
//! This module provides the primary interface of the library. A `Profiler`
//! owns one run's configuration and drives the whole pipeline: header parse,
//! configuration resolution, then the streaming body loop of
//! decode -> cache update -> per-timestamp dispatch -> sampling.
//!
//! Ordering contract: a timestamp is closed only after every value change
//! belonging to it has been decoded and applied. Observer dispatch happens
//! first, then the sampling controller's edge check, so a sample always sees
//! the fully updated instant.

use crate::config::{ProfileConfig, ProfileMode};
use crate::decode::{self, DecodePolicy, RawValue, UnknownPolicy};
use crate::formats::{Token, VcdLexer};
use crate::sample::SamplingController;
use crate::signals::{header, SignalTable};
use crate::stats::SignalProbe;
use crate::types::{
    DecodeIssue, DecodeReason, Metadata, ProfilerError, Result, SignalId, Timestamp,
};
use crate::watch::{WatchHandle, WatcherRegistry};
use std::io::BufRead;
use std::path::Path;

/// Per-signal result of a finished run
#[derive(Debug, Clone)]
pub struct SignalResult {
    pub id: SignalId,
    /// Dotted hierarchical name, e.g. `top.alu.acc`
    pub name: String,
    /// The accumulated table or series
    pub probe: SignalProbe,
}

/// Counters collected over one run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    /// Distinct timestamps that carried activity
    pub timestamps: u64,
    /// Value-change records applied
    pub changes: u64,
    /// Samples emitted by the sampling controller
    pub samples: u64,
    /// Recorded, non-fatal decode errors
    pub decode_errors: usize,
}

/// Everything a finished run produces
#[derive(Debug)]
pub struct ProfileOutcome {
    pub metadata: Metadata,
    /// The symbol table, for callers that want to inspect the hierarchy
    pub table: SignalTable,
    /// One entry per watched signal, in declaration order
    pub results: Vec<SignalResult>,
    /// Recorded per-event problems, in stream order
    pub issues: Vec<DecodeIssue>,
    pub stats: RunStats,
}

impl ProfileOutcome {
    /// Find a watched signal's result by dotted name
    pub fn result(&self, name: &str) -> Option<&SignalResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

/// The profiling pipeline - entry point of the library
pub struct Profiler {
    config: ProfileConfig,
}

impl Profiler {
    /// Create a profiler for one configuration
    pub fn new(config: ProfileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Profile a dump file
    ///
    /// # Example
    /// ```no_run
    /// use vcd_profiler::{ProfileConfig, Profiler};
    /// use std::path::Path;
    ///
    /// let profiler = Profiler::new(ProfileConfig::new("clk"));
    /// let outcome = profiler.run_file(Path::new("run.vcd")).unwrap();
    /// for result in &outcome.results {
    ///     println!("{}: {} observations", result.name, result.probe.observations());
    /// }
    /// ```
    pub fn run_file(&self, path: &Path) -> Result<ProfileOutcome> {
        let mut lexer = VcdLexer::open(path)?;
        self.run(&mut lexer)
    }

    /// Profile a dump from any buffered reader
    pub fn run_reader<R: BufRead>(&self, reader: R) -> Result<ProfileOutcome> {
        let mut lexer = VcdLexer::new(reader);
        self.run(&mut lexer)
    }

    fn run<R: BufRead>(&self, lexer: &mut VcdLexer<R>) -> Result<ProfileOutcome> {
        self.config
            .validate()
            .map_err(ProfilerError::Configuration)?;

        let header::Header { table, metadata } = header::parse_header(lexer)?;

        let mut state = RunState::resolve(&self.config, table)?;
        log::info!(
            "Watching {} of {} signals, clock `{}`",
            state.watched.len(),
            state.table.len(),
            self.config.clock_signal
        );

        loop {
            let item = match lexer.next_token() {
                Some(item) => item,
                None => break,
            };
            let line = lexer.line();
            let token = match item {
                Ok(token) => token,
                Err(e) => {
                    state.record_issue(DecodeReason::Malformed(e.message), e.line)?;
                    continue;
                }
            };

            match token {
                Token::Timestamp(t) => state.advance_time(t, line)?,
                Token::Scalar { bit, code } => {
                    state.apply_change(RawValue::Scalar(bit), &code, line)?
                }
                Token::Vector { bits, code } => {
                    state.apply_change(RawValue::Vector(&bits), &code, line)?
                }
                Token::Real { literal, code } => {
                    state.apply_change(RawValue::Real(&literal), &code, line)?
                }
                Token::DumpDirective(name) => {
                    log::trace!("{} section at line {}", name, line);
                }
                Token::Comment(_) => {}
                Token::Date(_)
                | Token::Version(_)
                | Token::Timescale(_)
                | Token::ScopeBegin { .. }
                | Token::ScopeEnd
                | Token::Var { .. }
                | Token::EndDefinitions => {
                    state.record_issue(
                        DecodeReason::Malformed(
                            "declaration command after $enddefinitions".to_string(),
                        ),
                        line,
                    )?;
                }
            }
        }

        let outcome = state.finish(metadata);
        log::info!(
            "Profiled {} changes over {} timestamps, {} samples, {} decode errors",
            outcome.stats.changes,
            outcome.stats.timestamps,
            outcome.stats.samples,
            outcome.stats.decode_errors
        );
        Ok(outcome)
    }
}

/// Mutable state of the body phase
struct RunState<'a> {
    config: &'a ProfileConfig,
    table: SignalTable,
    policy: DecodePolicy,
    lenient: DecodePolicy,
    watched: Vec<SignalId>,
    watched_mask: Vec<bool>,
    registry: WatcherRegistry<SignalProbe>,
    handles: Vec<(SignalId, WatchHandle)>,
    sampler: SamplingController,
    issues: Vec<DecodeIssue>,
    stats: RunStats,
    current_time: Timestamp,
    /// Any change applied since the last timestamp close
    dirty: bool,
}

impl<'a> RunState<'a> {
    /// Resolve configured names against the symbol table and wire up the
    /// registry and sampling controller. Every failure here is a
    /// configuration error, raised before a single body token is consumed.
    fn resolve(config: &'a ProfileConfig, table: SignalTable) -> Result<RunState<'a>> {
        let clock_matches = table.resolve(&config.clock_signal);
        let clock = match clock_matches.len() {
            0 => {
                return Err(ProfilerError::Configuration(format!(
                    "clock signal `{}` is not declared in the dump",
                    config.clock_signal
                )))
            }
            1 => clock_matches[0],
            n => {
                return Err(ProfilerError::Configuration(format!(
                    "clock signal `{}` is ambiguous ({} matches); use its dotted path",
                    config.clock_signal, n
                )))
            }
        };

        let mut watched: Vec<SignalId> = match &config.signals {
            None => table.all_ids(),
            Some(names) => {
                let mut ids = Vec::new();
                for name in names {
                    let matches = table.resolve(name);
                    if matches.is_empty() {
                        return Err(ProfilerError::Configuration(format!(
                            "watched signal `{}` is not declared in the dump",
                            name
                        )));
                    }
                    ids.extend(matches);
                }
                ids
            }
        };
        watched.sort_unstable();
        watched.dedup();

        let mut watched_mask = vec![false; table.len()];
        for &id in &watched {
            watched_mask[id.index()] = true;
        }

        let mut registry = WatcherRegistry::new();
        let handles: Vec<(SignalId, WatchHandle)> = watched
            .iter()
            .map(|&id| {
                let probe = match config.mode {
                    ProfileMode::Frequency => SignalProbe::frequency(),
                    ProfileMode::Timeseries => SignalProbe::time_series(),
                };
                (id, registry.register(id, probe))
            })
            .collect();

        let sampler = SamplingController::new(clock, config.edge, table.len());

        Ok(RunState {
            config,
            policy: config.decode_policy(),
            lenient: DecodePolicy::lenient(),
            watched,
            watched_mask,
            registry,
            handles,
            sampler,
            table,
            issues: Vec::new(),
            stats: RunStats::default(),
            current_time: 0,
            dirty: false,
        })
    }

    /// Decode one value-change record and apply it to cache and registry
    fn apply_change(&mut self, raw: RawValue<'_>, code: &str, line: usize) -> Result<()> {
        let id = match self.table.signal_by_code(code) {
            Some(id) => id,
            None => return self.record_issue(DecodeReason::UnknownCode(code.to_string()), line),
        };

        let watched = self.watched_mask[id.index()];
        let policy = if watched { self.policy } else { self.lenient };

        match decode::decode(raw, self.table.signal(id), &policy) {
            Ok(value) => {
                self.sampler.record_change(id, value);
                self.registry.queue_change(id, value);
                self.stats.changes += 1;
                self.dirty = true;
                Ok(())
            }
            Err(reason) => {
                // only the `fail` policy produces this reason, and it
                // escalates on first occurrence
                if matches!(reason, DecodeReason::UnknownBits(_))
                    && policy.unknown == UnknownPolicy::Fail
                {
                    return Err(ProfilerError::Decode {
                        reason,
                        line,
                        near_time: self.current_time,
                    });
                }
                self.record_issue(reason, line)
            }
        }
    }

    /// Process a `#t` marker; duplicate markers collapse into one instant
    fn advance_time(&mut self, t: Timestamp, line: usize) -> Result<()> {
        if t == self.current_time {
            return Ok(());
        }
        if t < self.current_time {
            return self.record_issue(
                DecodeReason::NonMonotonicTime {
                    from: self.current_time,
                    to: t,
                },
                line,
            );
        }
        self.close_timestamp();
        self.current_time = t;
        Ok(())
    }

    /// Close the current instant: dispatch queued changes to observers,
    /// then let the sampling controller snapshot if an edge qualified
    fn close_timestamp(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.stats.timestamps += 1;

        self.registry.dispatch_changes(self.current_time);

        if let Some(sample) = self.sampler.end_of_timestamp(self.current_time, &self.watched) {
            self.stats.samples += 1;
            for (signal, value) in &sample.values {
                self.registry.dispatch_sample(sample.time, *signal, value);
            }
        }
    }

    fn record_issue(&mut self, reason: DecodeReason, line: usize) -> Result<()> {
        let issue = DecodeIssue {
            line,
            near_time: self.current_time,
            reason,
        };
        log::warn!("Skipping event: {}", issue);
        self.issues.push(issue);
        self.stats.decode_errors += 1;

        let limit = self.config.max_decode_errors;
        if limit > 0 && self.stats.decode_errors > limit {
            return Err(ProfilerError::DecodeLimitExceeded {
                count: self.stats.decode_errors,
                line,
            });
        }
        Ok(())
    }

    /// Close the final instant and collect per-signal results
    fn finish(mut self, metadata: Metadata) -> ProfileOutcome {
        self.close_timestamp();

        let mut results = Vec::with_capacity(self.handles.len());
        for (id, handle) in std::mem::take(&mut self.handles) {
            if let Some(probe) = self.registry.remove(handle) {
                results.push(SignalResult {
                    id,
                    name: self.table.signal(id).full_name(),
                    probe,
                });
            }
        }

        ProfileOutcome {
            metadata,
            table: self.table,
            results,
            issues: self.issues,
            stats: self.stats,
        }
    }
}
