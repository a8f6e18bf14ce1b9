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
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of entries retained by a simulator log panel.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Failure,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Failure => "failure",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Sequential identifier assigned when appending.
    pub sequence: u64,
    /// Simulated seconds since the owning simulator was created or reset.
    pub sim_time_secs: f64,
    /// Wall-clock time the entry was recorded.
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

/// Bounded, append-only operator log. The sequence counter belongs to the
/// instance so separate simulators never share numbering.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<EventLogEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    /// Append an entry, evicting the oldest when full. Returns the sequence.
    pub fn append(
        &mut self,
        sim_time_secs: f64,
        severity: Severity,
        message: impl Into<String>,
    ) -> u64 {
        self.next_sequence += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(EventLogEntry {
            sequence: self.next_sequence,
            sim_time_secs,
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        });
        self.next_sequence
    }

    /// Drop every entry and restart numbering.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_sequence = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&EventLogEntry> {
        self.entries.back()
    }

    /// Oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &EventLogEntry> + '_ {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<EventLogEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}
