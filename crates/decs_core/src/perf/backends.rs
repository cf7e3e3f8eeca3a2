//! Shipped profiler backends.

use std::time::Instant;

use super::{MeasurementError, PerfStats, Profiler};

/// Backend that measures nothing and reports zero stats.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProfiler;

impl Profiler for NullProfiler {
    fn open(&mut self) -> Result<(), MeasurementError> {
        Ok(())
    }

    fn start(&mut self) -> Result<(), MeasurementError> {
        Ok(())
    }

    fn end(&mut self) -> Result<PerfStats, MeasurementError> {
        Ok(PerfStats::default())
    }

    fn close(&mut self) {}
}

/// Wall-clock backend.
///
/// Elapsed nanoseconds are reported in the `instructions` slot; the other
/// counters stay zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClockProfiler {
    started: Option<Instant>,
}

impl ClockProfiler {
    /// Creates an idle clock profiler.
    #[must_use]
    pub const fn new() -> Self {
        Self { started: None }
    }
}

impl Profiler for ClockProfiler {
    fn open(&mut self) -> Result<(), MeasurementError> {
        self.started = None;
        Ok(())
    }

    fn start(&mut self) -> Result<(), MeasurementError> {
        if self.started.is_some() {
            return Err(MeasurementError::AlreadyStarted);
        }
        self.started = Some(Instant::now());
        Ok(())
    }

    fn end(&mut self) -> Result<PerfStats, MeasurementError> {
        let started = self.started.take().ok_or(MeasurementError::NotStarted)?;
        let elapsed = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        Ok(PerfStats {
            instructions: elapsed,
            ..PerfStats::default()
        })
    }

    fn close(&mut self) {
        self.started = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_reports_zero() {
        let mut profiler = NullProfiler;
        profiler.open().unwrap();
        profiler.start().unwrap();
        assert_eq!(profiler.end().unwrap(), PerfStats::default());
    }

    #[test]
    fn test_clock_requires_start() {
        let mut profiler = ClockProfiler::new();
        profiler.open().unwrap();
        assert_eq!(profiler.end(), Err(MeasurementError::NotStarted));

        profiler.start().unwrap();
        assert_eq!(profiler.start(), Err(MeasurementError::AlreadyStarted));
        let stats = profiler.end().unwrap();
        assert_eq!(stats.cache_references, 0);
        assert_eq!(stats.branch_misses, 0);
    }

    #[test]
    fn test_clock_measures_elapsed() {
        let mut profiler = ClockProfiler::new();
        profiler.start().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let stats = profiler.end().unwrap();
        assert!(stats.instructions >= 2_000_000);
    }
}
