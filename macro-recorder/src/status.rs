//! Status lines shown to the user by whatever renders the recorder

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::recorder::SlotId;

pub const ADDING_RECORD: &str = "Adding Record... waiting for key combination";
pub const DELETING_RECORD: &str = "Deleting Record... waiting for key combination";
pub const RECORDING: &str = "Recording....";
pub const SIMULATING_RECORD: &str = "Simulating Record...";
pub const CURRENT_RECORD: &str = "Current Record = ";

pub fn current_record_line(slot: SlotId) -> String {
    format!("{}{}", CURRENT_RECORD, slot)
}

/// Ordered list of status lines, shared with a renderer on another thread.
#[derive(Debug, Default)]
pub struct StatusBoard {
    lines: Mutex<Vec<String>>,
}

/// Exclusive access to the lines for a multi-step update
pub struct StatusLines<'a> {
    lines: MutexGuard<'a, Vec<String>>,
}

impl StatusLines<'_> {
    pub fn add(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Remove the first line equal to `line`. Returns whether one was found.
    pub fn remove(&mut self, line: &str) -> bool {
        match self.lines.iter().position(|l| l == line) {
            Some(index) => {
                self.lines.remove(index);
                true
            }
            None => false,
        }
    }

    /// Swap `old` for `new` in place, or append `new` if `old` is not shown.
    pub fn replace(&mut self, old: &str, new: impl Into<String>) {
        let new = new.into();
        match self.lines.iter_mut().find(|l| *l == old) {
            Some(slot) => *slot = new,
            None => self.lines.push(new),
        }
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the lines. A poisoned lock is recovered since lines are plain text.
    pub fn lock(&self) -> StatusLines<'_> {
        StatusLines {
            lines: self.lines.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn add_line(&self, line: impl Into<String>) {
        self.lock().add(line);
    }

    pub fn remove_line(&self, line: &str) -> bool {
        self.lock().remove(line)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lock().lines.clone()
    }
}
