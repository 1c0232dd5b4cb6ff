//! Tagging pipeline event types
//!
//! Supporting types for progress tracking of a tagging run.

use serde::{Deserialize, Serialize};

/// Progress of one tagging run
///
/// Reported after every processed file. `completed` never decreases within a
/// run and is reset at the start of the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Files processed so far
    pub completed: usize,
    /// Files selected for processing in this run
    pub total: usize,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Progress reported when a scan selects nothing to do
    pub fn finished_empty() -> Self {
        Self::new(1, 1)
    }

    /// Completed fraction in `[0.0, 1.0]`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).min(1.0)
    }
}
