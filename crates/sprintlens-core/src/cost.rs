//! Monetary cost of delivered work.
//!
//! Only closed tasks planned into one of the selected iterations are costed,
//! and only with the worklogs dated inside that iteration. Each worklog is
//! priced at the rate of the developer who logged it, falling back to the
//! task's responsible developer when the worklog names nobody.
//!
//! Client and feature rollups fan out the way [`crate::aggregate`] does, so
//! they can add up to more than the total. Developer and iteration rollups
//! partition it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::aggregate::NONE_LABEL;
use crate::classify;
use crate::metrics::sanitize_hours;
use crate::model::{find_by_label, sorted_by_start, HourlyRates, SprintMetadata, Task};
use crate::worklogs::WorklogIndex;

/// Totals for one rollup group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub label: String,
    pub hours: f64,
    pub cost: f64,
    pub task_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    /// Iterations included, in calendar order
    pub iterations: Vec<String>,
    pub total_hours: f64,
    pub total_cost: f64,
    /// Zero when no hours were costed
    pub average_cost_per_hour: f64,
    pub qualifying_tasks: usize,
    pub by_client: Vec<CostLine>,
    pub by_feature: Vec<CostLine>,
    pub by_developer: Vec<CostLine>,
    pub by_iteration: Vec<CostLine>,
    /// Developers with costed hours but no configured rate
    pub unrated_developers: Vec<String>,
}

#[derive(Default)]
struct Rollup {
    groups: HashMap<String, (f64, f64, BTreeSet<usize>)>,
}

impl Rollup {
    fn add(&mut self, label: &str, position: usize, hours: f64, cost: f64) {
        let group = self.groups.entry(label.to_string()).or_default();
        group.0 += hours;
        group.1 += cost;
        group.2.insert(position);
    }

    fn into_lines(self) -> Vec<CostLine> {
        let mut lines: Vec<CostLine> = self
            .groups
            .into_iter()
            .map(|(label, (hours, cost, tasks))| CostLine {
                label,
                hours,
                cost,
                task_count: tasks.len(),
            })
            .collect();
        lines.sort_by(|a, b| b.cost.total_cmp(&a.cost).then_with(|| a.label.cmp(&b.label)));
        lines
    }
}

fn labels_or_none(values: &[String]) -> Vec<&str> {
    let mut labels: Vec<&str> = values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
    labels.sort_unstable();
    labels.dedup();
    if labels.is_empty() {
        labels.push(NONE_LABEL);
    }
    labels
}

/// Computes [`CostReport`]s.
#[derive(Debug, Clone)]
pub struct CostAggregator {
    today: NaiveDate,
}

impl CostAggregator {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Cost the worklogs of qualifying tasks.
    ///
    /// `selection` names the iterations to include; `None` selects every
    /// iteration that has already ended. Unknown names are ignored.
    pub fn aggregate(
        &self,
        tasks: &[Task],
        worklogs: &WorklogIndex<'_>,
        sprints: &[SprintMetadata],
        rates: &HourlyRates,
        selection: Option<&[String]>,
    ) -> CostReport {
        let selected: Vec<SprintMetadata> = sorted_by_start(sprints)
            .into_iter()
            .filter(|sprint| match selection {
                Some(names) => names.iter().any(|name| sprint.matches_label(name)),
                None => sprint.is_completed(self.today),
            })
            .collect();

        let mut by_client = Rollup::default();
        let mut by_feature = Rollup::default();
        let mut by_developer = Rollup::default();
        let mut by_iteration = Rollup::default();
        let mut unrated: BTreeSet<String> = BTreeSet::new();
        let mut total_hours = 0.0;
        let mut total_cost = 0.0;
        let mut qualifying_tasks = 0;

        for (position, task) in tasks.iter().enumerate() {
            if !classify::is_fully_completed(&task.status) {
                continue;
            }
            let Some(sprint) = task.sprint_label().and_then(|label| find_by_label(&selected, label)) else {
                continue;
            };
            qualifying_tasks += 1;

            let mut task_hours = 0.0;
            let mut task_cost = 0.0;
            for entry in worklogs.entries_in(position, sprint.window()) {
                let hours = sanitize_hours(entry.hours);
                if hours == 0.0 {
                    continue;
                }
                let developer = entry
                    .developer_name()
                    .or_else(|| task.responsible.as_deref().map(str::trim).filter(|name| !name.is_empty()));
                let cost = match developer {
                    Some(name) => {
                        if rates.get(name).is_none() {
                            unrated.insert(name.to_string());
                        }
                        hours * rates.rate_for(name)
                    }
                    None => 0.0,
                };
                by_developer.add(developer.unwrap_or(NONE_LABEL), position, hours, cost);
                task_hours += hours;
                task_cost += cost;
            }

            if task_hours == 0.0 {
                continue;
            }
            total_hours += task_hours;
            total_cost += task_cost;
            by_iteration.add(&sprint.name, position, task_hours, task_cost);
            for client in labels_or_none(&task.clients) {
                by_client.add(client, position, task_hours, task_cost);
            }
            for feature in labels_or_none(&task.features) {
                by_feature.add(feature, position, task_hours, task_cost);
            }
        }

        CostReport {
            iterations: selected.iter().map(|sprint| sprint.name.clone()).collect(),
            total_hours,
            total_cost,
            average_cost_per_hour: if total_hours > 0.0 { total_cost / total_hours } else { 0.0 },
            qualifying_tasks,
            by_client: by_client.into_lines(),
            by_feature: by_feature.into_lines(),
            by_developer: by_developer.into_lines(),
            by_iteration: by_iteration.into_lines(),
            unrated_developers: unrated.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorklogEntry;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn calendar() -> Vec<SprintMetadata> {
        vec![
            SprintMetadata::new("S1", d(1, 1), d(1, 14)),
            SprintMetadata::new("S2", d(1, 15), d(1, 28)),
            SprintMetadata::new("S3", d(1, 29), d(2, 11)),
        ]
    }

    fn rates() -> HourlyRates {
        HourlyRates::new().with_rate("Ana", 100.0).with_rate("Bia", 50.0)
    }

    fn report(tasks: &[Task], worklogs: &[WorklogEntry], selection: Option<&[String]>) -> CostReport {
        let index = WorklogIndex::build(tasks, worklogs);
        CostAggregator::new(d(2, 1)).aggregate(tasks, &index, &calendar(), &rates(), selection)
    }

    #[test]
    fn prices_each_worklog_by_its_developer() {
        let tasks = vec![Task::new("1", "C-1")
            .with_status("Closed")
            .with_sprint("S1")
            .with_responsible("Ana")
            .with_clients(["Acme"])];
        let worklogs = vec![
            WorklogEntry::new("C-1", d(1, 2), 2.0).by("Bia"),
            WorklogEntry::new("C-1", d(1, 3), 1.0),
            // Outside the iteration window.
            WorklogEntry::new("C-1", d(1, 20), 5.0).by("Ana"),
        ];
        let r = report(&tasks, &worklogs, None);
        assert_eq!(r.total_hours, 3.0);
        assert_eq!(r.total_cost, 200.0);
        assert!((r.average_cost_per_hour - 200.0 / 3.0).abs() < 1e-9);
        let bia = r.by_developer.iter().find(|l| l.label == "Bia").unwrap();
        assert_eq!(bia.cost, 100.0);
        let ana = r.by_developer.iter().find(|l| l.label == "Ana").unwrap();
        assert_eq!(ana.hours, 1.0);
    }

    #[test]
    fn default_selection_is_completed_iterations_and_closed_tasks() {
        let tasks = vec![
            Task::new("1", "C-1").with_status("Closed").with_sprint("S1"),
            Task::new("2", "C-2").with_status("Closed").with_sprint("S3"),
            Task::new("3", "C-3").with_status("Ready for QA").with_sprint("S1"),
            Task::new("4", "C-4").with_status("Closed"),
        ];
        let worklogs = vec![
            WorklogEntry::new("C-1", d(1, 2), 1.0).by("Ana"),
            WorklogEntry::new("C-2", d(1, 30), 1.0).by("Ana"),
            WorklogEntry::new("C-3", d(1, 2), 1.0).by("Ana"),
            WorklogEntry::new("C-4", d(1, 2), 1.0).by("Ana"),
        ];
        let r = report(&tasks, &worklogs, None);
        assert_eq!(r.iterations, vec!["S1".to_string(), "S2".to_string()]);
        assert_eq!(r.qualifying_tasks, 1);
        assert_eq!(r.total_cost, 100.0);

        let only_s3 = vec!["S3".to_string()];
        let r = report(&tasks, &worklogs, Some(only_s3.as_slice()));
        assert_eq!(r.iterations, only_s3);
        assert_eq!(r.total_hours, 1.0);
    }

    #[test]
    fn rollups_reconcile_and_fan_out() {
        let tasks = vec![
            Task::new("1", "C-1").with_status("Closed").with_sprint("S1").with_clients(["Acme", "Globex"]),
            Task::new("2", "C-2").with_status("Closed").with_sprint("S2").with_features(["Billing"]),
        ];
        let worklogs = vec![
            WorklogEntry::new("C-1", d(1, 2), 2.0).by("Ana"),
            WorklogEntry::new("C-1", d(1, 3), 2.0).by("Zed"),
            WorklogEntry::new("C-2", d(1, 16), 3.0).by("Bia"),
        ];
        let r = report(&tasks, &worklogs, None);
        let dev_total: f64 = r.by_developer.iter().map(|l| l.cost).sum();
        let iteration_total: f64 = r.by_iteration.iter().map(|l| l.cost).sum();
        assert!((dev_total - r.total_cost).abs() < 1e-9);
        assert!((iteration_total - r.total_cost).abs() < 1e-9);
        assert_eq!(r.total_cost, 350.0);

        let client_total: f64 = r.by_client.iter().map(|l| l.cost).sum();
        assert_eq!(client_total, 550.0);
        assert!(r.by_client.iter().any(|l| l.label == NONE_LABEL));
        assert_eq!(r.unrated_developers, vec!["Zed".to_string()]);
    }

    #[test]
    fn no_hours_means_zero_average() {
        let r = report(&[], &[], None);
        assert_eq!(r.total_hours, 0.0);
        assert_eq!(r.average_cost_per_hour, 0.0);
        assert!(r.by_developer.is_empty());
    }
}
