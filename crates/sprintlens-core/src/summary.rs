//! Per-iteration summaries.
//!
//! Workload figures use the current-iteration scope (what is left and what
//! was spent this iteration). The accuracy section uses the lifetime scope so
//! carried-over tasks are judged against their original estimate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::aggregate::{aggregate, AggregateOptions, AggregateRow, Dimension, NONE_LABEL};
use crate::classify;
use crate::metrics::{reconcile, sanitize_hours, AccuracySummary, MetricScope};
use crate::model::{sorted_by_start, SprintMetadata, SprintPhase, Task};
use crate::worklogs::WorklogIndex;

/// Hours a developer logged inside an iteration window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedHours {
    pub developer: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintSummary {
    pub sprint: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub phase: SprintPhase,
    pub task_count: usize,
    /// Developer-delivered, including tasks still in QA
    pub delivered: usize,
    /// Closed for good
    pub closed: usize,
    pub blocked: usize,
    pub with_impediment: usize,
    pub hours_estimated: f64,
    pub hours_spent: f64,
    /// Estimate still open on undelivered tasks
    pub remaining_hours: f64,
    /// Hours spent on meetings and training
    pub neutral_hours: f64,
    pub workload: Vec<AggregateRow>,
    /// Worklog hours dated in the window, by logging developer
    pub logged: Vec<LoggedHours>,
    pub accuracy: AccuracySummary,
}

/// Builds [`SprintSummary`]s.
#[derive(Debug, Clone)]
pub struct SprintSummarizer {
    pub today: NaiveDate,
    pub accuracy_tolerance_pct: f64,
}

impl SprintSummarizer {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            accuracy_tolerance_pct: 10.0,
        }
    }

    pub fn with_tolerance(mut self, tolerance_pct: f64) -> Self {
        self.accuracy_tolerance_pct = tolerance_pct;
        self
    }

    pub fn summarize(&self, tasks: &[Task], worklogs: &WorklogIndex<'_>, sprints: &[SprintMetadata]) -> Vec<SprintSummary> {
        let sorted = sorted_by_start(sprints);
        let logged = logged_by_sprint(tasks, worklogs, &sorted);

        sorted
            .iter()
            .zip(logged)
            .map(|(sprint, logged)| {
                let members: Vec<&Task> = tasks
                    .iter()
                    .filter(|task| task.sprint_label().is_some_and(|label| sprint.matches_label(label)))
                    .collect();
                self.summarize_one(sprint, &members, logged)
            })
            .collect()
    }

    fn summarize_one(&self, sprint: &SprintMetadata, members: &[&Task], logged: Vec<LoggedHours>) -> SprintSummary {
        let mut summary = SprintSummary {
            sprint: sprint.name.clone(),
            start: sprint.start,
            end: sprint.end,
            phase: sprint.phase(self.today),
            task_count: members.len(),
            delivered: 0,
            closed: 0,
            blocked: 0,
            with_impediment: 0,
            hours_estimated: 0.0,
            hours_spent: 0.0,
            remaining_hours: 0.0,
            neutral_hours: 0.0,
            workload: aggregate(members.iter().copied(), Dimension::Responsible, AggregateOptions::default()),
            logged,
            accuracy: AccuracySummary::from_tasks(members.iter().copied(), self.accuracy_tolerance_pct),
        };

        for task in members {
            let metrics = reconcile(task, MetricScope::CurrentIteration);
            let delivered = classify::is_completed(&task.status);
            summary.hours_estimated += metrics.hours_estimated;
            summary.hours_spent += metrics.hours_spent;
            if delivered {
                summary.delivered += 1;
            } else {
                summary.remaining_hours += metrics.hours_estimated;
            }
            if classify::is_fully_completed(&task.status) {
                summary.closed += 1;
            }
            if classify::is_blocked(&task.status) {
                summary.blocked += 1;
            }
            if classify::has_work_impediment(&task.hidden_details) {
                summary.with_impediment += 1;
            }
            if classify::is_neutral(&task.hidden_details) {
                summary.neutral_hours += metrics.hours_spent;
            }
        }
        summary
    }
}

/// Worklog hours per iteration, each entry counted in the first iteration
/// (by start date) whose window contains it.
fn logged_by_sprint(tasks: &[Task], worklogs: &WorklogIndex<'_>, sorted: &[SprintMetadata]) -> Vec<Vec<LoggedHours>> {
    let mut per_sprint: Vec<HashMap<String, f64>> = vec![HashMap::new(); sorted.len()];

    for (position, task) in tasks.iter().enumerate() {
        for entry in worklogs.entries(position) {
            let Some(i) = sorted.iter().position(|sprint| sprint.window().contains(entry.date)) else {
                continue;
            };
            let developer = entry
                .developer_name()
                .or_else(|| task.responsible.as_deref())
                .unwrap_or(NONE_LABEL);
            *per_sprint[i].entry(developer.to_string()).or_default() += sanitize_hours(entry.hours);
        }
    }

    per_sprint
        .into_iter()
        .map(|hours| {
            let mut rows: Vec<LoggedHours> = hours
                .into_iter()
                .map(|(developer, hours)| LoggedHours { developer, hours })
                .collect();
            rows.sort_by(|a, b| b.hours.total_cmp(&a.hours).then_with(|| a.developer.cmp(&b.developer)));
            rows
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorklogEntry;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn summarizes_sprint_members() {
        let sprints = vec![
            SprintMetadata::new("S2", d(1, 15), d(1, 28)),
            SprintMetadata::new("S1", d(1, 1), d(1, 14)),
        ];
        let tasks = vec![
            Task::new("1", "A-1")
                .with_sprint("S1")
                .with_status("Closed")
                .with_responsible("Ana")
                .with_lifetime(10.0, 12.0),
            Task::new("2", "A-2")
                .with_sprint("S1")
                .with_status("Blocked")
                .with_responsible("Bia")
                .with_lifetime(8.0, 2.0)
                .with_current_iteration(Some(5.0), Some(1.0))
                .with_hidden_details(["Impediment"]),
            Task::new("3", "A-3")
                .with_sprint("S1")
                .with_status("Ready for QA")
                .with_lifetime(4.0, 4.0)
                .with_hidden_details(["meeting"]),
            Task::new("4", "A-4").with_sprint("S2").with_lifetime(3.0, 0.0),
            Task::new("5", "A-5"),
        ];
        let worklogs = vec![
            WorklogEntry::new("A-1", d(1, 3), 6.0),
            WorklogEntry::new("A-1", d(1, 4), 2.0).by("Bia"),
            WorklogEntry::new("A-2", d(1, 16), 1.0).by("Bia"),
        ];
        let index = WorklogIndex::build(&tasks, &worklogs);
        let summaries = SprintSummarizer::new(d(1, 20)).summarize(&tasks, &index, &sprints);

        assert_eq!(summaries.len(), 2);
        let s1 = &summaries[0];
        assert_eq!(s1.sprint, "S1");
        assert_eq!(s1.phase, SprintPhase::Completed);
        assert_eq!(s1.task_count, 3);
        assert_eq!(s1.delivered, 2);
        assert_eq!(s1.closed, 1);
        assert_eq!(s1.blocked, 1);
        assert_eq!(s1.with_impediment, 1);
        assert_eq!(s1.hours_estimated, 19.0);
        assert_eq!(s1.hours_spent, 17.0);
        assert_eq!(s1.remaining_hours, 5.0);
        assert_eq!(s1.neutral_hours, 4.0);
        assert_eq!(s1.accuracy.sample_count, 1);
        assert_eq!(s1.accuracy.underestimated, 1);
        assert_eq!(s1.logged[0], LoggedHours { developer: "Ana".into(), hours: 6.0 });
        assert_eq!(s1.logged[1], LoggedHours { developer: "Bia".into(), hours: 2.0 });

        let s2 = &summaries[1];
        assert_eq!(s2.phase, SprintPhase::Current);
        assert_eq!(s2.task_count, 1);
        assert_eq!(s2.logged, vec![LoggedHours { developer: "Bia".into(), hours: 1.0 }]);
    }
}
