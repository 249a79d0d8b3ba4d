//! Scan metrics.
//!
//! Small structs filled by `Session::prepare` and `Session::scan` to see
//! where a run spends its time and how often each lookup path is taken.
//! They never change results.
//!
//! - `PhaseMetrics` covers preparation: reading inputs, counting, writing
//!   enumeration files.
//! - `ScanMetrics` adds the per-password scan and the dispatch counters.

use std::time::{Duration, Instant};

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct PhaseMetrics {
    /// Reading and filtering the wordlist, rules and passwords.
    pub read: Duration,
    /// Parsing, classification and dependency extraction.
    pub analyze: Duration,
    /// Guess counting (or restoring saved counts).
    pub count: Duration,
    /// Writing or reusing enumeration files.
    pub enumerate: Duration,
    /// Whether counts came from the work directory.
    pub counts_restored: bool,
    /// Enumeration files reused from the work directory.
    pub enumerations_reused: usize,
}

/// Timings and counters of a whole run.
#[derive(Debug, Default, Clone)]
pub struct ScanMetrics {
    pub prepare: PhaseMetrics,
    /// Time in `Session::scan`.
    pub scan: Duration,
    pub passwords: usize,
    /// Passwords dropped by the policy.
    pub passwords_skipped: usize,
    /// Symbolic inversions run.
    pub inversions: usize,
    /// Inversions that gave up and fell back to a file lookup.
    pub out_of_scope: usize,
    pub inversion_errors: usize,
    /// Preimage sets checked word by word against the wordlist map.
    pub direct_lookups: usize,
    /// Preimage sets searched in the word trie.
    pub trie_lookups: usize,
    /// Searches of enumeration files.
    pub file_lookups: usize,
    /// Passwords with at least one guessing rule.
    pub guessed: usize,
}

impl ScanMetrics {
    pub fn total(&self) -> Duration {
        self.prepare.read + self.prepare.analyze + self.prepare.count + self.prepare.enumerate + self.scan
    }
}

/// Measures a phase: `let t = Timer::start(); ...; metrics.x += t.stop();`
#[derive(Debug, Clone, Copy)]
pub struct Timer(Instant);

impl Timer {
    pub fn start() -> Self {
        Timer(Instant::now())
    }

    pub fn stop(self) -> Duration {
        self.0.elapsed()
    }
}
