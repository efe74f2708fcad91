//! Backlog inflow/outflow per iteration.
//!
//! Attribution rules:
//! - **Inflow**: a backlog task (no real iteration label) is attributed to the
//!   iteration whose window contains its creation date. Creation dates in a
//!   gap between iterations go to the next iteration. Tasks created before the
//!   first iteration, or without a creation date, are legacy inflow. Tasks
//!   created after the last iteration ended are untracked inflow.
//! - **Outflow**: a closed task is attributed to its assigned iteration. A
//!   closed backlog task is attributed to the iteration containing its
//!   resolution date, or its last worklog date when no resolution date exists.
//!
//! Meetings, training and maintenance categories stay out of the flow.
//! Hours are lifetime estimates: the volume of work entering or leaving.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify;
use crate::metrics::{reconcile, MetricScope};
use crate::model::{find_by_label, sorted_by_start, SprintMetadata, SprintPhase, Task, TaskType};
use crate::worklogs::WorklogIndex;

/// Category used in flow breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowCategory {
    /// Bug that is an actual defect
    RealBug,
    /// Bug tagged as a hidden question rather than a defect
    HiddenQuestionBug,
    /// Everything else
    Task,
}

impl FlowCategory {
    pub fn of(task: &Task) -> Self {
        match task.task_type {
            TaskType::Bug if classify::has_hidden_question(&task.hidden_details) => FlowCategory::HiddenQuestionBug,
            TaskType::Bug => FlowCategory::RealBug,
            _ => FlowCategory::Task,
        }
    }
}

/// Count and hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowCounts {
    pub count: usize,
    pub hours: f64,
}

impl FlowCounts {
    fn add(&mut self, hours: f64) {
        self.count += 1;
        self.hours += hours;
    }
}

/// Totals with a per-category breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowBreakdown {
    pub total: FlowCounts,
    pub real_bugs: FlowCounts,
    pub hidden_question_bugs: FlowCounts,
    pub tasks: FlowCounts,
}

impl FlowBreakdown {
    pub fn record(&mut self, task: &Task) {
        let hours = reconcile(task, MetricScope::Lifetime).hours_estimated;
        self.total.add(hours);
        match FlowCategory::of(task) {
            FlowCategory::RealBug => self.real_bugs.add(hours),
            FlowCategory::HiddenQuestionBug => self.hidden_question_bugs.add(hours),
            FlowCategory::Task => self.tasks.add(hours),
        }
    }

    pub fn count(&self) -> usize {
        self.total.count
    }

    pub fn hours(&self) -> f64 {
        self.total.hours
    }
}

/// `outflow / inflow`, with an explicit sentinel when nothing flowed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExitRatio {
    Finite(f64),
    /// Inflow was zero
    Unbounded,
}

impl ExitRatio {
    pub fn of(outflow: f64, inflow: f64) -> Self {
        if inflow > 0.0 && outflow.is_finite() {
            ExitRatio::Finite(outflow / inflow)
        } else {
            ExitRatio::Unbounded
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, ExitRatio::Unbounded)
    }

    /// Numeric value, `f64::INFINITY` for the sentinel.
    pub fn as_f64(&self) -> f64 {
        match self {
            ExitRatio::Finite(value) => *value,
            ExitRatio::Unbounded => f64::INFINITY,
        }
    }
}

/// Flow figures for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationFlow {
    pub sprint: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub phase: SprintPhase,
    pub inflow: FlowBreakdown,
    pub outflow: FlowBreakdown,
    /// Outflow count minus inflow count
    pub net_flow: i64,
    pub net_flow_hours: f64,
    pub exit_ratio: ExitRatio,
}

/// Averages over completed iterations only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowAverages {
    pub avg_inflow: f64,
    pub avg_outflow: f64,
    pub avg_net_flow: f64,
    pub avg_inflow_hours: f64,
    pub avg_outflow_hours: f64,
    pub avg_exit_ratio: ExitRatio,
    /// Iterations the averages were computed from
    pub completed_iterations: usize,
    /// Current and future iterations left out of the averages
    pub excluded_iterations: usize,
}

impl FlowAverages {
    fn from_iterations(iterations: &[IterationFlow]) -> Self {
        let completed: Vec<&IterationFlow> = iterations
            .iter()
            .filter(|flow| flow.phase == SprintPhase::Completed)
            .collect();
        let n = completed.len();
        let excluded = iterations.len() - n;
        if n == 0 {
            return Self {
                avg_inflow: 0.0,
                avg_outflow: 0.0,
                avg_net_flow: 0.0,
                avg_inflow_hours: 0.0,
                avg_outflow_hours: 0.0,
                avg_exit_ratio: ExitRatio::Unbounded,
                completed_iterations: 0,
                excluded_iterations: excluded,
            };
        }

        let avg_inflow = mean_of(&completed, |flow| flow.inflow.count() as f64);
        let avg_outflow = mean_of(&completed, |flow| flow.outflow.count() as f64);
        Self {
            avg_inflow,
            avg_outflow,
            avg_net_flow: mean_of(&completed, |flow| flow.net_flow as f64),
            avg_inflow_hours: mean_of(&completed, |flow| flow.inflow.hours()),
            avg_outflow_hours: mean_of(&completed, |flow| flow.outflow.hours()),
            avg_exit_ratio: ExitRatio::of(avg_outflow, avg_inflow),
            completed_iterations: n,
            excluded_iterations: excluded,
        }
    }

    /// True when in-progress or future iterations were left out.
    pub fn has_exclusions(&self) -> bool {
        self.excluded_iterations > 0
    }
}

fn mean_of(flows: &[&IterationFlow], f: impl Fn(&IterationFlow) -> f64) -> f64 {
    flows.iter().map(|flow| f(*flow)).sum::<f64>() / flows.len() as f64
}

/// Open work already allocated to an iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Iteration in progress today
    pub current: FlowBreakdown,
    /// Iteration not yet started
    pub future: FlowBreakdown,
    /// Iteration already ended with the task still open
    pub stale: FlowBreakdown,
    /// Label not found in the calendar
    pub unknown_sprint: FlowBreakdown,
}

/// Backlog flow across the whole calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogFlowReport {
    pub iterations: Vec<IterationFlow>,
    pub legacy_inflow: FlowBreakdown,
    pub untracked_inflow: FlowBreakdown,
    /// Closed tasks whose completion could not be placed in any iteration
    pub unattributed_outflow: FlowBreakdown,
    pub averages: FlowAverages,
    /// Open tasks with no iteration
    pub current_backlog: FlowBreakdown,
    pub allocation: Allocation,
}

/// Where a backlog task's creation lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InflowSlot {
    Iteration(usize),
    Legacy,
    Untracked,
}

/// Place a creation date against iterations sorted by start.
pub(crate) fn inflow_slot(created: Option<NaiveDate>, sorted: &[SprintMetadata]) -> InflowSlot {
    let (Some(created), Some(first)) = (created, sorted.first()) else {
        return InflowSlot::Legacy;
    };
    if created < first.start {
        return InflowSlot::Legacy;
    }
    if let Some(i) = sorted.iter().position(|sprint| sprint.window().contains(created)) {
        return InflowSlot::Iteration(i);
    }
    match sorted.iter().position(|sprint| sprint.start > created) {
        Some(i) => InflowSlot::Iteration(i),
        None => InflowSlot::Untracked,
    }
}

/// Iteration a closed task counts as outflow for, if any.
///
/// `position` is the task's index in the slice the worklog index was built
/// from.
pub(crate) fn outflow_iteration(
    task: &Task,
    position: usize,
    sorted: &[SprintMetadata],
    worklogs: &WorklogIndex<'_>,
) -> Option<usize> {
    if !classify::is_fully_completed(&task.status) {
        return None;
    }
    if let Some(label) = task.sprint_label() {
        return sorted.iter().position(|sprint| sprint.matches_label(label));
    }
    let completed_on = task.resolved.or_else(|| worklogs.last_logged(position))?;
    sorted.iter().position(|sprint| sprint.window().contains(completed_on))
}

/// Tasks that participate in backlog flow.
pub(crate) fn counts_toward_flow(task: &Task) -> bool {
    !classify::is_neutral(&task.hidden_details) && !classify::is_excluded_category(task)
}

/// Computes [`BacklogFlowReport`]s relative to a fixed `today`.
#[derive(Debug, Clone)]
pub struct BacklogFlowAnalyzer {
    today: NaiveDate,
}

impl BacklogFlowAnalyzer {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Analyze `tasks` against `sprints`. `worklogs` must have been built from
    /// the same `tasks` slice.
    pub fn analyze(&self, tasks: &[Task], worklogs: &WorklogIndex<'_>, sprints: &[SprintMetadata]) -> BacklogFlowReport {
        let sorted = sorted_by_start(sprints);
        let mut inflow = vec![FlowBreakdown::default(); sorted.len()];
        let mut outflow = vec![FlowBreakdown::default(); sorted.len()];
        let mut legacy_inflow = FlowBreakdown::default();
        let mut untracked_inflow = FlowBreakdown::default();
        let mut unattributed_outflow = FlowBreakdown::default();
        let mut current_backlog = FlowBreakdown::default();
        let mut allocation = Allocation::default();

        for (position, task) in tasks.iter().enumerate() {
            // Neutral and maintenance work stays out of flow but still
            // occupies the backlog and allocation below.
            if counts_toward_flow(task) {
                if task.is_backlog() {
                    match inflow_slot(task.created, &sorted) {
                        InflowSlot::Iteration(i) => inflow[i].record(task),
                        InflowSlot::Legacy => legacy_inflow.record(task),
                        InflowSlot::Untracked => untracked_inflow.record(task),
                    }
                }

                if classify::is_fully_completed(&task.status) {
                    match outflow_iteration(task, position, &sorted, worklogs) {
                        Some(i) => outflow[i].record(task),
                        None => unattributed_outflow.record(task),
                    }
                }
            }

            if classify::is_completed(&task.status) {
                continue;
            }
            match task.sprint_label() {
                None => current_backlog.record(task),
                Some(label) => match find_by_label(&sorted, label).map(|s| s.phase(self.today)) {
                    Some(SprintPhase::Current) => allocation.current.record(task),
                    Some(SprintPhase::Future) => allocation.future.record(task),
                    Some(SprintPhase::Completed) => allocation.stale.record(task),
                    None => allocation.unknown_sprint.record(task),
                },
            }
        }

        let iterations: Vec<IterationFlow> = sorted
            .iter()
            .zip(inflow)
            .zip(outflow)
            .map(|((sprint, inflow), outflow)| IterationFlow {
                sprint: sprint.name.clone(),
                start: sprint.start,
                end: sprint.end,
                phase: sprint.phase(self.today),
                net_flow: outflow.count() as i64 - inflow.count() as i64,
                net_flow_hours: outflow.hours() - inflow.hours(),
                exit_ratio: ExitRatio::of(outflow.count() as f64, inflow.count() as f64),
                inflow,
                outflow,
            })
            .collect();

        let averages = FlowAverages::from_iterations(&iterations);
        debug!(
            iterations = iterations.len(),
            completed = averages.completed_iterations,
            legacy = legacy_inflow.count(),
            backlog = current_backlog.count(),
            "computed backlog flow"
        );

        BacklogFlowReport {
            iterations,
            legacy_inflow,
            untracked_inflow,
            unattributed_outflow,
            averages,
            current_backlog,
            allocation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorklogEntry;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn calendar() -> Vec<SprintMetadata> {
        vec![
            SprintMetadata::new("S2", d(2024, 1, 15), d(2024, 1, 28)),
            SprintMetadata::new("S1", d(2024, 1, 1), d(2024, 1, 14)),
            SprintMetadata::new("S3", d(2024, 2, 1), d(2024, 2, 14)),
        ]
    }

    fn run(tasks: &[Task], worklogs: &[WorklogEntry], today: NaiveDate) -> BacklogFlowReport {
        let index = WorklogIndex::build(tasks, worklogs);
        BacklogFlowAnalyzer::new(today).analyze(tasks, &index, &calendar())
    }

    #[test]
    fn inflow_and_legacy_scenario() {
        let tasks = vec![
            Task::new("1", "B-1").with_created(d(2024, 1, 5)).with_lifetime(3.0, 0.0),
            Task::new("2", "B-2").with_created(d(2023, 12, 20)).with_lifetime(2.0, 0.0),
        ];
        let report = run(&tasks, &[], d(2024, 3, 1));
        assert_eq!(report.iterations[0].sprint, "S1");
        assert_eq!(report.iterations[0].inflow.count(), 1);
        assert_eq!(report.iterations[0].inflow.hours(), 3.0);
        assert_eq!(report.legacy_inflow.count(), 1);
        assert_eq!(report.iterations[1].inflow.count(), 0);
    }

    #[test]
    fn gap_goes_to_next_iteration_and_late_is_untracked() {
        let tasks = vec![
            Task::new("1", "B-1").with_created(d(2024, 1, 30)),
            Task::new("2", "B-2").with_created(d(2024, 3, 1)),
            Task::new("3", "B-3"),
            Task::new("4", "B-4").with_created(d(2024, 1, 10)).with_sprint("S1"),
        ];
        let report = run(&tasks, &[], d(2024, 3, 2));
        assert_eq!(report.iterations[2].inflow.count(), 1);
        assert_eq!(report.untracked_inflow.count(), 1);
        assert_eq!(report.legacy_inflow.count(), 1);
        // Task 4 was planned straight into S1: not backlog intake.
        assert_eq!(report.iterations[0].inflow.count(), 0);
    }

    #[test]
    fn outflow_prefers_assigned_iteration() {
        let tasks = vec![
            Task::new("1", "C-1").with_status("Closed").with_sprint("S1").with_resolved(d(2024, 1, 20)),
            Task::new("2", "C-2").with_status("Closed").with_resolved(d(2024, 1, 20)),
            Task::new("3", "C-3").with_status("Closed"),
            Task::new("4", "C-4").with_status("Ready for QA").with_sprint("S1"),
            Task::new("5", "C-5").with_status("Closed"),
        ];
        let worklogs = vec![WorklogEntry::new("C-3", d(2024, 2, 3), 1.0)];
        let report = run(&tasks, &worklogs, d(2024, 3, 1));
        assert_eq!(report.iterations[0].outflow.count(), 1);
        assert_eq!(report.iterations[1].outflow.count(), 1);
        assert_eq!(report.iterations[2].outflow.count(), 1);
        assert_eq!(report.unattributed_outflow.count(), 1);
    }

    #[test]
    fn exit_ratio_sentinel_when_no_inflow() {
        let tasks = vec![
            Task::new("1", "C-1").with_status("Closed").with_sprint("S1"),
            Task::new("2", "C-2").with_created(d(2024, 1, 16)),
            Task::new("3", "C-3").with_status("Closed").with_sprint("S2"),
            Task::new("4", "C-4").with_status("Closed").with_sprint("S2"),
        ];
        let report = run(&tasks, &[], d(2024, 3, 1));
        assert!(report.iterations[0].exit_ratio.is_unbounded());
        assert_eq!(report.iterations[1].exit_ratio, ExitRatio::Finite(2.0));
        assert_eq!(report.iterations[1].net_flow, 1);
        assert!(report.iterations[2].exit_ratio.is_unbounded());
        assert_eq!(report.iterations[2].outflow.count(), 0);
    }

    #[test]
    fn averages_skip_unfinished_iterations() {
        let tasks = vec![
            Task::new("1", "D-1").with_created(d(2024, 1, 3)),
            Task::new("2", "D-2").with_created(d(2024, 1, 4)),
            Task::new("3", "D-3").with_created(d(2024, 1, 20)),
            Task::new("4", "D-4").with_created(d(2024, 2, 2)),
        ];
        // S3 is in progress on 2024-02-05.
        let report = run(&tasks, &[], d(2024, 2, 5));
        let avg = report.averages;
        assert_eq!(avg.completed_iterations, 2);
        assert_eq!(avg.excluded_iterations, 1);
        assert!(avg.has_exclusions());
        assert_eq!(avg.avg_inflow, 1.5);
        assert_eq!(avg.avg_net_flow, -1.5);
        assert_eq!(avg.avg_exit_ratio, ExitRatio::Finite(0.0));
    }

    #[test]
    fn no_completed_iterations_yields_zero_averages() {
        let report = run(&[], &[], d(2023, 1, 1));
        assert_eq!(report.averages.completed_iterations, 0);
        assert_eq!(report.averages.excluded_iterations, 3);
        assert_eq!(report.averages.avg_inflow, 0.0);
        assert!(report.averages.avg_exit_ratio.is_unbounded());
    }

    #[test]
    fn category_breakdown() {
        let tasks = vec![
            Task::new("1", "E-1").with_type(TaskType::Bug).with_created(d(2024, 1, 2)),
            Task::new("2", "E-2")
                .with_type(TaskType::Bug)
                .with_hidden_details(["Hidden Question"])
                .with_created(d(2024, 1, 2)),
            Task::new("3", "E-3").with_type(TaskType::Story).with_created(d(2024, 1, 2)),
            Task::new("4", "E-4").with_hidden_details(["meeting"]).with_created(d(2024, 1, 2)),
        ];
        let report = run(&tasks, &[], d(2024, 3, 1));
        let inflow = report.iterations[0].inflow;
        assert_eq!(inflow.total.count, 3);
        assert_eq!(inflow.real_bugs.count, 1);
        assert_eq!(inflow.hidden_question_bugs.count, 1);
        assert_eq!(inflow.tasks.count, 1);
    }

    #[test]
    fn backlog_and_allocation() {
        let tasks = vec![
            Task::new("1", "F-1"),
            Task::new("2", "F-2").with_status("Ready for QA"),
            Task::new("3", "F-3").with_sprint("S2"),
            Task::new("4", "F-4").with_sprint("S3"),
            Task::new("5", "F-5").with_sprint("S1"),
            Task::new("6", "F-6").with_sprint("S9"),
            Task::new("7", "F-7").with_sprint("backlog"),
        ];
        let report = run(&tasks, &[], d(2024, 1, 20));
        assert_eq!(report.current_backlog.count(), 2);
        assert_eq!(report.allocation.current.count(), 1);
        assert_eq!(report.allocation.future.count(), 1);
        assert_eq!(report.allocation.stale.count(), 1);
        assert_eq!(report.allocation.unknown_sprint.count(), 1);
    }

    #[test]
    fn neutral_and_maintenance_work_occupies_backlog_without_flow() {
        let tasks = vec![
            Task::new("1", "G-1").with_hidden_details(["Meeting"]).with_created(d(2024, 1, 3)),
            Task::new("2", "G-2").with_features(["Manutenção"]).with_created(d(2024, 1, 3)),
            Task::new("3", "G-3").with_hidden_details(["Treinamento"]).with_sprint("S2"),
            Task::new("4", "G-4")
                .with_hidden_details(["Meeting"])
                .with_status("Closed")
                .with_sprint("S1"),
        ];
        let report = run(&tasks, &[], d(2024, 1, 20));
        assert_eq!(report.iterations[0].inflow.count(), 0);
        assert_eq!(report.iterations[0].outflow.count(), 0);
        assert_eq!(report.legacy_inflow.count(), 0);
        assert_eq!(report.current_backlog.count(), 2);
        assert_eq!(report.allocation.current.count(), 1);
    }
}
