//! Wall-clock stopwatch for a single benchmark run.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Start/end timestamps of one measured span.
///
/// Elapsed time comes from a monotonic clock, so readings taken while the
/// measurement is running never go backwards.
#[derive(Debug, Clone)]
pub struct Measurement {
    started_at: DateTime<Utc>,
    start: Instant,
    stopped: Option<(DateTime<Utc>, Duration)>,
}

impl Measurement {
    pub fn start() -> Self {
        Measurement {
            started_at: Utc::now(),
            start: Instant::now(),
            stopped: None,
        }
    }

    /// Freeze the end time. Later calls keep the first end time.
    pub fn stop(&mut self) {
        if self.stopped.is_none() {
            self.stopped = Some((Utc::now(), self.start.elapsed()));
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped.map(|(at, _)| at)
    }

    /// Time between start and stop, or start and now if still running.
    pub fn elapsed(&self) -> Duration {
        match self.stopped {
            Some((_, elapsed)) => elapsed,
            None => self.start.elapsed(),
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

/// Run `f` under a fresh measurement and stop it as soon as `f` returns.
pub fn measure_time<T>(f: impl FnOnce(&Measurement) -> T) -> (T, Measurement) {
    let mut measurement = Measurement::start();
    let value = f(&measurement);
    measurement.stop();
    (value, measurement)
}
