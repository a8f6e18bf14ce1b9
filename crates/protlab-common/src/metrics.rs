//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the simulation runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Number of most recent jitter samples kept for the summary.
pub const DEFAULT_JITTER_WINDOW: usize = 1024;

/// Jitter samples over a sliding window of the most recent frames.
#[derive(Debug)]
pub struct JitterHistogram {
    capacity: usize,
    samples: Mutex<VecDeque<f64>>,
}

impl Default for JitterHistogram {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JITTER_WINDOW)
    }
}

impl JitterHistogram {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, jitter: Duration) {
        let micros = jitter.as_secs_f64() * 1_000_000.0;
        let mut samples = self.samples.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(micros);
    }

    pub fn summary(&self) -> Option<JitterSummary> {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return None;
        }
        let count = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / count;
        let variance = if samples.len() > 1 {
            samples
                .iter()
                .map(|value| {
                    let delta = value - mean;
                    delta * delta
                })
                .sum::<f64>()
                / (count - 1.0)
        } else {
            0.0
        };
        Some(JitterSummary {
            mean_us: mean,
            std_dev_us: variance.sqrt(),
            max_us: samples.iter().copied().fold(f64::MIN, f64::max),
            min_us: samples.iter().copied().fold(f64::MAX, f64::min),
            samples: samples.len() as u64,
        })
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JitterSummary {
    pub mean_us: f64,
    pub std_dev_us: f64,
    pub max_us: f64,
    pub min_us: f64,
    pub samples: u64,
}

/// Measures the real time between animation frames against a target period.
///
/// The measured interval is what the simulators integrate over, so a slow
/// frame produces a larger `dt` instead of slowing the physics down.
#[derive(Debug)]
pub struct FrameTimingReporter {
    target_interval: Duration,
    last_frame: Mutex<Option<Instant>>,
    histogram: JitterHistogram,
}

impl FrameTimingReporter {
    pub fn new(target_interval: Duration) -> Self {
        Self {
            target_interval,
            last_frame: Mutex::new(None),
            histogram: JitterHistogram::default(),
        }
    }

    /// Record a frame at `now` and return the time elapsed since the previous
    /// one. The first frame has no predecessor and reports `None`.
    pub fn record_frame(&self, now: Instant) -> Option<Duration> {
        let mut last_frame = self.last_frame.lock();
        let elapsed = last_frame.map(|previous| now.saturating_duration_since(previous));
        if let Some(actual) = elapsed {
            let jitter = if actual > self.target_interval {
                actual - self.target_interval
            } else {
                self.target_interval - actual
            };
            self.histogram.record(jitter);
        }
        *last_frame = Some(now);
        elapsed
    }

    /// Forget the previous frame so the next one starts a fresh interval.
    pub fn reset(&self) {
        *self.last_frame.lock() = None;
    }

    pub fn target_interval(&self) -> Duration {
        self.target_interval
    }

    pub fn histogram(&self) -> &JitterHistogram {
        &self.histogram
    }
}
