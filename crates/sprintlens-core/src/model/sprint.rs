use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::DateWindow;

/// One iteration of the delivery calendar. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintMetadata {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Where an iteration sits relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintPhase {
    Completed,
    Current,
    Future,
}

impl SprintMetadata {
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start, self.end)
    }

    /// Completed only once the end date is strictly before today.
    pub fn is_completed(&self, today: NaiveDate) -> bool {
        self.end < today
    }

    pub fn phase(&self, today: NaiveDate) -> SprintPhase {
        if self.is_completed(today) {
            SprintPhase::Completed
        } else if self.start > today {
            SprintPhase::Future
        } else {
            SprintPhase::Current
        }
    }

    /// Label comparison used to join tasks to iterations.
    pub fn matches_label(&self, label: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(label.trim())
    }
}

/// Iterations sorted by start date (then name, for a stable order).
pub fn sorted_by_start(sprints: &[SprintMetadata]) -> Vec<SprintMetadata> {
    let mut sorted = sprints.to_vec();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.name.cmp(&b.name)));
    sorted
}

/// Find the iteration carrying `label`.
pub fn find_by_label<'a>(sprints: &'a [SprintMetadata], label: &str) -> Option<&'a SprintMetadata> {
    sprints.iter().find(|sprint| sprint.matches_label(label))
}
