//! # Performance Instrumentation
//!
//! Each system's execution is bracketed by a [`Profiler`] measurement. The
//! engine owns one [`ProfilingSession`] for its lifetime: the backend is
//! opened at construction and closed at cleanup or drop.
//!
//! Measurement is best effort. Failures are logged and never abort a tick;
//! the affected system's record keeps its previous stats.

mod backends;

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backends::{ClockProfiler, NullProfiler};

/// Errors raised by a profiler backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeasurementError {
    /// The backend could not acquire its counters.
    #[error("failed to open profiler: {0}")]
    Open(String),

    /// `end` was called without a matching `start`.
    #[error("measurement ended without being started")]
    NotStarted,

    /// `start` was called while a measurement was running.
    #[error("measurement already running")]
    AlreadyStarted,

    /// Reading a counter failed.
    #[error("failed to read counter: {0}")]
    Read(String),

    /// The session was disabled after a failed open, or already closed.
    #[error("profiler session is not active")]
    Inactive,
}

/// Counter values of one measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfStats {
    /// Retired instructions (cycle proxy; elapsed ns for the clock backend).
    pub instructions: u64,
    /// Cache references.
    pub cache_references: u64,
    /// Cache misses.
    pub cache_misses: u64,
    /// Retired branch instructions.
    pub branch_instructions: u64,
    /// Mispredicted branches.
    pub branch_misses: u64,
}

impl PerfStats {
    /// Cache miss ratio, or 0 without references.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cache_miss_ratio(&self) -> f64 {
        if self.cache_references == 0 {
            return 0.0;
        }
        self.cache_misses as f64 / self.cache_references as f64
    }

    /// Branch miss ratio, or 0 without branches.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn branch_miss_ratio(&self) -> f64 {
        if self.branch_instructions == 0 {
            return 0.0;
        }
        self.branch_misses as f64 / self.branch_instructions as f64
    }
}

impl AddAssign for PerfStats {
    fn add_assign(&mut self, rhs: Self) {
        self.instructions = self.instructions.saturating_add(rhs.instructions);
        self.cache_references = self.cache_references.saturating_add(rhs.cache_references);
        self.cache_misses = self.cache_misses.saturating_add(rhs.cache_misses);
        self.branch_instructions = self
            .branch_instructions
            .saturating_add(rhs.branch_instructions);
        self.branch_misses = self.branch_misses.saturating_add(rhs.branch_misses);
    }
}

/// Per-system accumulator of measurements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerfRecord {
    /// Stats of the most recent successful measurement.
    pub last: PerfStats,
    /// Sum over all successful measurements.
    pub total: PerfStats,
    /// Number of successful measurements.
    pub samples: u64,
    /// Number of failed measurements.
    pub failures: u64,
}

impl PerfRecord {
    /// Records a successful measurement.
    pub fn record(&mut self, stats: PerfStats) {
        self.last = stats;
        self.total += stats;
        self.samples += 1;
    }

    /// Records a failed measurement. `last` is left stale.
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Mean instruction count per sample.
    #[must_use]
    pub fn mean_instructions(&self) -> u64 {
        self.total
            .instructions
            .checked_div(self.samples)
            .unwrap_or(0)
    }
}

/// A measurement backend.
///
/// Hardware counter backends implement this the same way as the shipped
/// [`NullProfiler`] and [`ClockProfiler`].
pub trait Profiler {
    /// Acquires the backend's counters.
    ///
    /// # Errors
    ///
    /// Returns `MeasurementError::Open` if the counters are unavailable.
    fn open(&mut self) -> Result<(), MeasurementError>;

    /// Resets and enables the counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the counters cannot be enabled.
    fn start(&mut self) -> Result<(), MeasurementError>;

    /// Disables the counters and reads them.
    ///
    /// # Errors
    ///
    /// Returns an error if no measurement is running or a read fails.
    fn end(&mut self) -> Result<PerfStats, MeasurementError>;

    /// Releases the counters.
    fn close(&mut self);
}

/// Profiler backend selection, as written in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfilerKind {
    /// No measurement.
    #[default]
    None,
    /// Wall-clock nanoseconds.
    Clock,
}

impl ProfilerKind {
    /// Instantiates the backend.
    #[must_use]
    pub fn build(self) -> Box<dyn Profiler> {
        match self {
            Self::None => Box::new(NullProfiler),
            Self::Clock => Box::new(ClockProfiler::new()),
        }
    }
}

/// Scoped ownership of a profiler backend.
///
/// Opened once, closed once. A backend that fails to open leaves the session
/// inactive, and every later measurement reports [`MeasurementError::Inactive`].
pub struct ProfilingSession {
    backend: Box<dyn Profiler>,
    active: bool,
}

impl ProfilingSession {
    /// Opens `backend`. Failure is logged and disables the session.
    #[must_use]
    pub fn open(mut backend: Box<dyn Profiler>) -> Self {
        let active = match backend.open() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Performance measurement disabled: {}", err);
                false
            }
        };
        Self { backend, active }
    }

    /// A session over [`NullProfiler`].
    #[must_use]
    pub fn null() -> Self {
        Self::open(Box::new(NullProfiler))
    }

    /// True until closed or after a failed open.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Starts a measurement.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or `Inactive`.
    pub fn start(&mut self) -> Result<(), MeasurementError> {
        if !self.active {
            return Err(MeasurementError::Inactive);
        }
        self.backend.start()
    }

    /// Ends the running measurement.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or `Inactive`.
    pub fn end(&mut self) -> Result<PerfStats, MeasurementError> {
        if !self.active {
            return Err(MeasurementError::Inactive);
        }
        self.backend.end()
    }

    /// Closes the backend. Idempotent.
    pub fn close(&mut self) {
        if self.active {
            self.backend.close();
            self.active = false;
        }
    }
}

impl Drop for ProfilingSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ProfilingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilingSession")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingOpen;

    impl Profiler for FailingOpen {
        fn open(&mut self) -> Result<(), MeasurementError> {
            Err(MeasurementError::Open("no counters".to_string()))
        }
        fn start(&mut self) -> Result<(), MeasurementError> {
            Ok(())
        }
        fn end(&mut self) -> Result<PerfStats, MeasurementError> {
            Ok(PerfStats::default())
        }
        fn close(&mut self) {}
    }

    #[test]
    fn test_record_accumulates() {
        let mut record = PerfRecord::default();
        let stats = PerfStats {
            instructions: 10,
            cache_references: 4,
            cache_misses: 1,
            branch_instructions: 2,
            branch_misses: 0,
        };
        record.record(stats);
        record.record(PerfStats {
            instructions: 30,
            ..stats
        });

        assert_eq!(record.samples, 2);
        assert_eq!(record.last.instructions, 30);
        assert_eq!(record.total.instructions, 40);
        assert_eq!(record.total.cache_references, 8);
        assert_eq!(record.mean_instructions(), 20);
    }

    #[test]
    fn test_failure_keeps_last_stats() {
        let mut record = PerfRecord::default();
        record.record(PerfStats {
            instructions: 5,
            ..PerfStats::default()
        });
        record.record_failure();
        assert_eq!(record.last.instructions, 5);
        assert_eq!(record.failures, 1);
        assert_eq!(record.samples, 1);
    }

    #[test]
    fn test_ratios() {
        let stats = PerfStats {
            cache_references: 4,
            cache_misses: 1,
            ..PerfStats::default()
        };
        assert!((stats.cache_miss_ratio() - 0.25).abs() < f64::EPSILON);
        assert!(stats.branch_miss_ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_open_disables_session() {
        let mut session = ProfilingSession::open(Box::new(FailingOpen));
        assert!(!session.is_active());
        assert_eq!(session.start(), Err(MeasurementError::Inactive));
        assert_eq!(session.end(), Err(MeasurementError::Inactive));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = ProfilingSession::open(ProfilerKind::Clock.build());
        assert!(session.is_active());
        session.close();
        session.close();
        assert!(!session.is_active());
    }

    #[test]
    fn test_profiler_kind_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            profiler: ProfilerKind,
        }
        let parsed: Wrapper = toml::from_str("profiler = \"clock\"").unwrap();
        assert_eq!(parsed.profiler, ProfilerKind::Clock);
        let parsed: Wrapper = toml::from_str("profiler = \"none\"").unwrap();
        assert_eq!(parsed.profiler, ProfilerKind::None);
    }
}
