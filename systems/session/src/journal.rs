//! Bounded activity log shown to the player.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info, warn};

/// Importance of a journal entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine activity.
    Info,
    /// A refused action.
    Error,
    /// A milestone such as a completed level.
    Success,
}

/// Single line of the journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Monotonic position of the entry within the run.
    pub sequence: u64,
    /// Importance of the entry.
    pub severity: Severity,
    /// Message shown to the player.
    pub message: String,
}

/// Ring of the most recent journal entries, oldest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Journal {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl Journal {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    pub(crate) fn record(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info => debug!(target: "journal", "{message}"),
            Severity::Success => info!(target: "journal", "{message}"),
            Severity::Error => warn!(target: "journal", "{message}"),
        }

        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            sequence: self.next_sequence,
            severity,
            message,
        });
        self.next_sequence += 1;
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.next_sequence = 0;
    }

    /// Iterates over the retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Most recent entry, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the journal holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Journal, Severity};

    #[test]
    fn oldest_entries_fall_off_the_front() {
        let mut journal = Journal::with_capacity(3);

        for index in 0..5 {
            journal.record(Severity::Info, format!("entry {index}"));
        }

        let messages: Vec<&str> = journal.iter().map(|entry| entry.message.as_str()).collect();
        assert_eq!(messages, vec!["entry 2", "entry 3", "entry 4"]);
        assert_eq!(journal.latest().map(|entry| entry.sequence), Some(4));
    }

    #[test]
    fn clearing_restarts_sequence_numbers() {
        let mut journal = Journal::with_capacity(2);
        journal.record(Severity::Error, "refused");

        journal.clear();
        journal.record(Severity::Success, "done");

        assert_eq!(journal.len(), 1);
        assert_eq!(journal.latest().map(|entry| entry.sequence), Some(0));
    }
}
