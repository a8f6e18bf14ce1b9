//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime helpers and scenario engines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;

use serde::Serialize;

/// Default number of samples kept for trend charts.
pub const DEFAULT_HISTORY_CAPACITY: usize = 300;

/// Fixed-capacity ring of recent samples; pushing onto a full buffer evicts
/// the oldest sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffer already full of `value`, as drawn for a steady-state bus.
    pub fn filled(capacity: usize, value: f64) -> Self {
        let mut buffer = Self::new(capacity);
        buffer.fill(value);
        buffer
    }

    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Replace the contents with `capacity` copies of `value`.
    pub fn fill(&mut self, value: f64) {
        self.samples.clear();
        self.samples.extend(std::iter::repeat(value).take(self.capacity));
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// Smallest and largest finite samples.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.iter()
            .filter(|value| value.is_finite())
            .fold(None, |acc, value| match acc {
                None => Some((value, value)),
                Some((min, max)) => Some((min.min(value), max.max(value))),
            })
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
