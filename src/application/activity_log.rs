// Bounded operator-facing activity log, newest entry first
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

pub const ACTIVITY_LOG_CAPACITY: usize = 8;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivityEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl ActivityEntry {
    pub fn line(&self) -> String {
        format!("> {}", self.message)
    }
}

#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(ACTIVITY_LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(ActivityEntry {
            at: Utc::now(),
            message: message.into(),
        });
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ActivityEntry::line).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first_and_bounded() {
        let mut log = ActivityLog::default();
        for i in 0..10 {
            log.record(format!("entry {}", i));
        }

        let lines = log.lines();
        assert_eq!(lines.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(lines[0], "> entry 9");
        assert_eq!(lines[7], "> entry 2");
    }
}
