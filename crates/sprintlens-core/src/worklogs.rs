//! Worklog-to-task attribution.
//!
//! [`WorklogIndex`] walks the worklog collection once and files every entry
//! under the task it references (by id or code). Reports read entries through
//! the index, so no entry is visited twice for the same task.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::dates::DateWindow;
use crate::metrics::sanitize_hours;
use crate::model::{Task, WorklogEntry};

/// Sanity figures over the whole worklog collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorklogAudit {
    pub total_entries: usize,
    /// Every logged hour, attributed or not
    pub total_hours_logged: f64,
    pub attributed_hours: f64,
    pub orphan_entries: usize,
    pub orphan_hours: f64,
    /// Distinct task references that matched no task
    pub orphan_refs: Vec<String>,
}

/// Worklog entries grouped by task position in the snapshot.
#[derive(Debug, Clone, Default)]
pub struct WorklogIndex<'a> {
    by_task: Vec<Vec<&'a WorklogEntry>>,
    audit: WorklogAudit,
}

impl<'a> WorklogIndex<'a> {
    pub fn build(tasks: &[Task], worklogs: &'a [WorklogEntry]) -> Self {
        let mut keys: HashMap<&str, usize> = HashMap::with_capacity(tasks.len() * 2);
        for (position, task) in tasks.iter().enumerate() {
            // Ids win over codes when the two collide.
            if !task.code.trim().is_empty() {
                keys.entry(task.code.trim()).or_insert(position);
            }
            if !task.id.trim().is_empty() {
                keys.insert(task.id.trim(), position);
            }
        }

        let mut by_task: Vec<Vec<&WorklogEntry>> = vec![Vec::new(); tasks.len()];
        let mut audit = WorklogAudit::default();
        let mut orphan_refs: Vec<String> = Vec::new();

        for entry in worklogs {
            let hours = sanitize_hours(entry.hours);
            audit.total_entries += 1;
            audit.total_hours_logged += hours;

            match keys.get(entry.task_ref.trim()) {
                Some(&position) => {
                    audit.attributed_hours += hours;
                    by_task[position].push(entry);
                }
                None => {
                    audit.orphan_entries += 1;
                    audit.orphan_hours += hours;
                    if !orphan_refs.iter().any(|r| r == entry.task_ref.trim()) {
                        orphan_refs.push(entry.task_ref.trim().to_string());
                    }
                }
            }
        }

        if audit.orphan_entries > 0 {
            warn!(
                orphan_entries = audit.orphan_entries,
                orphan_hours = audit.orphan_hours,
                refs = ?orphan_refs,
                "worklog entries reference unknown tasks"
            );
        }
        orphan_refs.sort();
        audit.orphan_refs = orphan_refs;

        Self { by_task, audit }
    }

    /// Entries logged against the task at `position` in the snapshot.
    pub fn entries(&self, position: usize) -> &[&'a WorklogEntry] {
        self.by_task.get(position).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries for `position` dated inside `window`.
    pub fn entries_in(&self, position: usize, window: DateWindow) -> impl Iterator<Item = &'a WorklogEntry> + '_ {
        self.entries(position)
            .iter()
            .copied()
            .filter(move |entry| window.contains(entry.date))
    }

    /// Most recent logged date for the task at `position`.
    pub fn last_logged(&self, position: usize) -> Option<NaiveDate> {
        self.entries(position).iter().map(|entry| entry.date).max()
    }

    pub fn audit(&self) -> &WorklogAudit {
        &self.audit
    }
}
